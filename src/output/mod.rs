//! Output formatting module
//!
//! Provides various output formats for routing results.

mod formatter;

pub use formatter::{summaries_to_csv, OutputFormat, ResultFormatter};
