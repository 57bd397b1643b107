//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent
//! formatting and appropriate exit codes.

use std::fmt;
use std::process;

use buddywatch::config::ConfigFileError;
use buddywatch::feed::FeedError;
use buddywatch::roster::RosterError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Invalid roster operation (bad id, duplicate, unknown buddy)
    Validation(RosterError),
    /// Failed to read or write the configuration file
    Config(ConfigFileError),
    /// Failed to start the position feed
    Feed(FeedError),
    /// Failed waiting for the shutdown signal
    Signal(std::io::Error),
}

impl CliError {
    /// Exit code for this error: validation failures are `1`,
    /// configuration persistence failures are `2`.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Feed(FeedError::Bind { port, .. }) = self {
            eprintln!();
            eprintln!("Common issues:");
            eprintln!("  1. Another process is already listening on UDP port {}", port);
            eprintln!("  2. Ports below 1024 need elevated privileges");
            eprintln!("Pick a different port with: buddywatch watch --port <port>");
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Validation(e) => write!(f, "{}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Feed(e) => write!(f, "Failed to start position feed: {}", e),
            CliError::Signal(e) => write!(f, "Failed to wait for shutdown signal: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Validation(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Feed(e) => Some(e),
            CliError::Signal(e) => Some(e),
        }
    }
}

impl From<RosterError> for CliError {
    fn from(e: RosterError) -> Self {
        CliError::Validation(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}
