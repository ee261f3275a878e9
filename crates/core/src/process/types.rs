//! Types for the process module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// A fully built extractor tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name or path (e.g. `spotdl`, `yt-dlp`).
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub working_dir: Option<PathBuf>,
    /// Job identity used for progress routing.
    pub correlation_id: Uuid,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, correlation_id: Uuid) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            correlation_id,
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
}

/// Result of one completed process run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Full merged stdout+stderr capture.
    pub captured: String,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Process runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Hard wall-clock ceiling for a single tool run, in seconds.
    ///
    /// A stalled external tool would otherwise hold the single-flight
    /// guard indefinitely.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

fn default_job_timeout() -> u64 {
    3600
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            job_timeout_secs: default_job_timeout(),
        }
    }
}
