//! HTTP client module for gateway probing
//!
//! Provides the raw HTTP transport used by the probes.

mod client;

pub use client::{HttpClient, HttpError};
