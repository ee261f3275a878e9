//! Error types for the process module.

use thiserror::Error;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be spawned at all.
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnError { program: String, reason: String },

    /// The caller was interrupted while waiting for output; the child
    /// has been terminated.
    #[error("Process '{program}' interrupted")]
    Interrupted { program: String },

    /// The run exceeded the configured wall-clock ceiling.
    #[error("Process '{program}' timed out after {timeout_secs} seconds")]
    Timeout { program: String, timeout_secs: u64 },

    /// I/O failure while reading process output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// Whether the executable itself was missing (user-actionable).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SpawnError { reason, .. } if reason.contains("not found"))
    }
}
