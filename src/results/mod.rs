//! Results storage module
//!
//! Persists routing runs so they can be listed, inspected and exported later.

mod storage;

pub use storage::{ExportFormat, ResultsStorage, RunConfig, StoredRun};
