//! Error types for the flink-proto crate.

use thiserror::Error;

/// Errors that can occur while decoding or validating wire messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to decode a message.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Unknown changelog operation code.
    #[error("invalid changelog operation: {0}")]
    InvalidOperation(u8),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl From<serde_json::Error> for ProtoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}
