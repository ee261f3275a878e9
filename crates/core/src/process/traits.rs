//! Trait definitions for the process module.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use super::error::ProcessError;
use super::types::{ProcessOutput, ToolCommand};

/// Runs an external tool and streams its output line by line.
///
/// Implementations must merge stderr into the same line stream, forward
/// every line to the progress sink before delivering it to the caller,
/// and terminate the child when the shutdown signal fires.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Returns the name of this runner implementation.
    fn name(&self) -> &str;

    /// Run the command to completion, delivering each output line on
    /// `line_tx` as it arrives.
    ///
    /// Dropping the receiver stops line delivery but the run continues;
    /// the complete capture is always returned in [`ProcessOutput`].
    async fn run(
        &self,
        cmd: ToolCommand,
        line_tx: mpsc::Sender<String>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<ProcessOutput, ProcessError>;

    /// Check whether an executable can be invoked at all.
    async fn is_installed(&self, program: &str) -> bool;
}
