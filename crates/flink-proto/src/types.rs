//! Core types shared by the statement and result messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-reported lifecycle phase of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Accepted but not yet scheduled on the compute pool.
    #[default]
    Pending,
    /// Executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Being removed.
    Deleting,
    /// Finished with an error.
    Failed,
    /// Failing; the server is still tearing the job down.
    Failing,
    /// Stop was requested and is being applied.
    Stopping,
    /// Stopped by the user.
    Stopped,
    /// A phase this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Phase {
    /// Check if this is a terminal phase.
    ///
    /// Everything that is not pending, running or being deleted is treated as
    /// terminal, including phases this client does not recognize.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running | Self::Deleting)
    }

    /// Check if the statement ended (or is ending) with a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Failing)
    }

    /// Wire representation of the phase.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Deleting => "DELETING",
            Self::Failed => "FAILED",
            Self::Failing => "FAILING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phase = match s.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "DELETING" => Self::Deleting,
            "FAILED" => Self::Failed,
            "FAILING" => Self::Failing,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            _ => Self::Unknown,
        };
        Ok(phase)
    }
}
