//! Mock process runner for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::process::{ProcessError, ProcessOutput, ProcessRunner, ToolCommand};

/// One scripted tool run.
#[derive(Debug, Clone)]
struct ScriptedRun {
    lines: Vec<String>,
    exit_code: i32,
}

/// Mock implementation of the ProcessRunner trait.
///
/// Each `with_run` queues a scripted invocation: its lines are streamed
/// to the caller and the exit code is returned. Commands are recorded
/// for assertions. Clones share state, so a test can keep a handle for
/// inspection after handing the runner to a downloader.
#[derive(Debug, Clone, Default)]
pub struct MockProcessRunner {
    scripts: Arc<Mutex<VecDeque<ScriptedRun>>>,
    commands: Arc<Mutex<Vec<ToolCommand>>>,
    installed: Arc<Mutex<bool>>,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
            commands: Arc::new(Mutex::new(Vec::new())),
            installed: Arc::new(Mutex::new(true)),
        }
    }

    /// Queue a scripted run.
    pub fn with_run(self, lines: Vec<String>, exit_code: i32) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push_back(ScriptedRun { lines, exit_code });
        self
    }

    /// Control the tool-presence check.
    pub fn with_installed(self, installed: bool) -> Self {
        *self.installed.lock().unwrap() = installed;
        self
    }

    /// Commands recorded so far, in invocation order.
    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(
        &self,
        cmd: ToolCommand,
        line_tx: mpsc::Sender<String>,
        _shutdown: broadcast::Receiver<()>,
    ) -> Result<ProcessOutput, ProcessError> {
        self.commands.lock().unwrap().push(cmd);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedRun {
                lines: Vec::new(),
                exit_code: 0,
            });

        for line in &script.lines {
            let _ = line_tx.send(line.clone()).await;
        }

        Ok(ProcessOutput {
            exit_code: Some(script.exit_code),
            captured: script.lines.join("\n"),
            duration: Duration::from_millis(1),
        })
    }

    async fn is_installed(&self, _program: &str) -> bool {
        *self.installed.lock().unwrap()
    }
}
