//! Vocabulary shared by the three record panels.
//!
//! Every panel runs the same cycle: a remote call clears the notice, then on
//! success the list is re-fetched wholesale, on failure a notice is raised and
//! the last confirmed list stays on screen. A call in flight holds the panel
//! borrowed, so there is no pending state to show.

use serde::Serialize;
use tracing::error;

use crate::error::StoreError;

/// What a panel operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The remote call succeeded and the list was re-fetched.
    Applied,
    /// Nothing was sent: invalid input or an unknown record.
    Skipped,
    /// The remote call failed; a notice was raised.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Log a failed remote call and build the notice shown for it.
    pub fn remote_failure(panel: &'static str, action: &'static str, err: &StoreError) -> Self {
        error!(panel, action, error = %err, "Remote call failed");
        Self::error(format!("Could not {action}: {err}"))
    }
}
