//! Live progress broadcasting.
//!
//! Every output line produced by an extractor tool is forwarded to a
//! progress sink so callers can show live job output. The sink is
//! fire-and-forget: a full or closed channel is logged and ignored,
//! it never blocks or fails the job.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// One line of live progress output, tagged for routing back to the caller.
#[derive(Debug, Clone)]
pub struct ProgressLine {
    pub timestamp: DateTime<Utc>,
    /// Identifies which acquisition job this line belongs to.
    pub correlation_id: Uuid,
    pub text: String,
}

/// Handle for broadcasting progress lines.
///
/// Cheaply cloneable; shared between the process runner and the
/// acquisition orchestrator.
#[derive(Clone)]
pub struct ProgressHandle {
    tx: mpsc::Sender<ProgressLine>,
}

impl ProgressHandle {
    /// Create a progress handle backed by a bounded channel.
    ///
    /// Returns the handle and the receiving end for whatever transport
    /// the embedding application uses (terminal, websocket, ...).
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressLine>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Create a handle from an existing sender.
    pub fn new(tx: mpsc::Sender<ProgressLine>) -> Self {
        Self { tx }
    }

    /// Broadcast a line without blocking.
    ///
    /// Dropping lines under backpressure is acceptable for progress
    /// output; losing a line must never fail the job.
    pub fn broadcast(&self, correlation_id: Uuid, text: &str) {
        let line = ProgressLine {
            timestamp: Utc::now(),
            correlation_id,
            text: text.to_string(),
        };
        if let Err(e) = self.tx.try_send(line) {
            tracing::debug!("Progress line dropped: {}", e);
        }
    }
}
