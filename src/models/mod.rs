//! Data models for routing validation
//!
//! This module contains all data structures used throughout the application.

mod provider;
mod test_case;
mod test_result;

pub use provider::Provider;
pub use test_case::{
    GatewayTarget, TestCase, Transport, VirtualKey, DEFAULT_GATEWAY_URL, DEFAULT_MAX_TOKENS,
    DEFAULT_TIMEOUT_SECS, IDENTITY_PROMPT,
};
pub use test_result::{
    CaseProgress, CaseState, ConsistencyReport, Outcome, RunSummary,
    ValidationResult,
};
