//! Statement error taxonomy.

use std::time::Duration;

use thiserror::Error;

use crate::gateway::GatewayError;

/// Status code attached to a cancelled result retrieval.
pub const CANCELLED_STATUS_CODE: u16 = 499;

/// Errors produced while processing a statement.
///
/// Local statement errors ([`StatementError::Syntax`] and
/// [`StatementError::Config`]) are never retried. Remote errors carry enough
/// detail to render a user-facing message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatementError {
    /// Malformed local command.
    #[error("{message}")]
    Syntax {
        /// What is wrong.
        message: String,
        /// Valid forms of the command.
        usage: Vec<String>,
        /// Optional hint on how to fix the statement.
        suggestion: Option<String>,
    },

    /// Well-formed command that is not allowed in the current session state.
    #[error("{message}")]
    Config {
        /// What is wrong.
        message: String,
        /// Optional hint on how to fix the statement.
        suggestion: Option<String>,
    },

    /// Network or HTTP failure reported by the gateway.
    #[error("{message}")]
    Remote {
        /// Error message.
        message: String,
        /// Server-provided status detail, if any.
        detail: Option<String>,
        /// HTTP status code, if any.
        status_code: Option<u16>,
    },

    /// Too many retryable server conditions while the statement was pending.
    #[error("the server can't process this statement right now, exiting after {retries} retries")]
    RetryBudgetExceeded {
        /// Number of retryable conditions observed.
        retries: usize,
        /// The captured conditions, joined.
        detail: String,
    },

    /// The statement was still pending when the session timeout elapsed.
    #[error(
        "statement is still pending after {secs} seconds. If you want to increase the timeout for the client, \
         you can run \"SET '{property}'='<milliseconds>';\" to adjust the maximum timeout in milliseconds.",
        secs = .timeout.as_secs()
    )]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
        /// Session property that controls the timeout.
        property: &'static str,
        /// Retryable conditions captured while waiting, joined.
        detail: String,
    },

    /// The caller cancelled while the statement was pending.
    #[error("result retrieval aborted. Statement will be deleted.")]
    Cancelled {
        /// Fixed sentinel status code, see [`CANCELLED_STATUS_CODE`].
        status_code: u16,
    },

    /// A result page could not be converted with the declared schema.
    #[error("error converting results: {0}")]
    ResultConversion(String),
}

impl StatementError {
    /// Create a syntax error.
    pub(crate) fn syntax(message: impl Into<String>, usage: &[&str]) -> Self {
        Self::Syntax {
            message: message.into(),
            usage: usage.iter().map(|u| (*u).to_string()).collect(),
            suggestion: None,
        }
    }

    /// Create a configuration error.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a cancellation error.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self::Cancelled {
            status_code: CANCELLED_STATUS_CODE,
        }
    }

    /// Attach a suggestion to a syntax or configuration error.
    #[must_use]
    pub(crate) fn with_suggestion(mut self, hint: impl Into<String>) -> Self {
        match &mut self {
            Self::Syntax { suggestion, .. } | Self::Config { suggestion, .. } => {
                *suggestion = Some(hint.into());
            }
            _ => {}
        }
        self
    }

    /// HTTP-like status code, when one applies.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Remote { status_code, .. } => *status_code,
            Self::Cancelled { status_code } => Some(*status_code),
            _ => None,
        }
    }

    /// Usage lines of a syntax error.
    #[must_use]
    pub fn usage(&self) -> &[String] {
        match self {
            Self::Syntax { usage, .. } => usage,
            _ => &[],
        }
    }

    /// Suggestion of a syntax or configuration error.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Syntax { suggestion, .. } | Self::Config { suggestion, .. } => {
                suggestion.as_deref()
            }
            _ => None,
        }
    }

    /// Server-side failure detail, when one was captured.
    #[must_use]
    pub fn failure_detail(&self) -> Option<&str> {
        match self {
            Self::Remote { detail, .. } => detail.as_deref(),
            Self::RetryBudgetExceeded { detail, .. } | Self::Timeout { detail, .. } => {
                (!detail.is_empty()).then_some(detail.as_str())
            }
            _ => None,
        }
    }

    /// Whether the error comes from a local command rather than the service.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::Config { .. })
    }
}

impl From<GatewayError> for StatementError {
    fn from(err: GatewayError) -> Self {
        Self::Remote {
            message: err.message,
            detail: err.detail.filter(|d| !d.is_empty()),
            status_code: err.status_code,
        }
    }
}
