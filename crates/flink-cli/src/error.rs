//! CLI error types.

use flink_store::StatementError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Statement processing failed.
    #[error(transparent)]
    Statement(#[from] StatementError),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// HTTP client setup failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),
    /// History file error.
    #[error("history error: {0}")]
    History(String),
    /// Line editor error.
    #[error("line editor error: {0}")]
    Readline(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
