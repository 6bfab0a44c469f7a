//! Logging setup
//!
//! Diagnostics go to stderr through `tracing`, so stdout carries only the
//! report and stays safe to pipe.

use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// `--verbose` forces debug; otherwise a configured level, else info
    pub fn resolve(verbose: bool, configured: Option<&str>) -> Self {
        if verbose {
            return LogLevel::Debug;
        }
        configured.and_then(Self::from_str).unwrap_or(LogLevel::Info)
    }

    fn as_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// `RUST_LOG` wins; otherwise only this crate's events at `level`
fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("routecheck={}", level.as_level())))
}

pub fn init_logger(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
