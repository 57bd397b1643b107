//! Logging infrastructure.
//!
//! Structured logging with dual output: a session log file (cleared on
//! start) plus stdout for interactive tailing. Verbosity is controlled
//! via the `RUST_LOG` environment variable, defaulting to `info`.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "buddywatch.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Creates the log directory if needed and clears the previous
/// session's file.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log
/// file cannot be cleared.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Clear the previous session's log
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // tracing uses a process-global subscriber, so init_logging itself
    // is exercised manually / in the binary; these cover the file
    // handling it relies on.

    #[test]
    fn test_session_file_is_cleared() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_LOG_FILE);
        fs::write(&path, "old session").unwrap();

        fs::write(&path, "").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_nested_log_directory_creation() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("logs");

        fs::create_dir_all(&nested).unwrap();
        assert!(nested.exists());
    }
}
