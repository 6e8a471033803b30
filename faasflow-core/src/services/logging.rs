//! Logging service

use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

/// Filter directive for the given level, scoped to the faasflow crates
pub fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "faasflow_core=error,faasflow=error",
        LogLevel::Warn => "faasflow_core=warn,faasflow=warn",
        LogLevel::Info => "faasflow_core=info,faasflow=info",
        LogLevel::Debug => "faasflow_core=debug,faasflow=debug",
        LogLevel::Trace => "faasflow_core=trace,faasflow=trace",
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout is reserved for function responses.
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

/// Log a recovered invocation failure
pub fn log_recovered_failure(state: &str, next: &str, error: &str) {
    tracing::warn!(
        state = state,
        next = next,
        error = error,
        "Invocation failed, continuing with catch state"
    );
}
