//! Tokio-based process runner implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Duration, Instant as TokioInstant};
use tracing::{debug, warn};

use crate::progress::ProgressHandle;

use super::error::ProcessError;
use super::traits::ProcessRunner;
use super::types::{ProcessConfig, ProcessOutput, ToolCommand};

/// Process runner backed by `tokio::process`.
pub struct TokioProcessRunner {
    config: ProcessConfig,
    progress: ProgressHandle,
}

impl TokioProcessRunner {
    pub fn new(config: ProcessConfig, progress: ProgressHandle) -> Self {
        Self { config, progress }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn name(&self) -> &str {
        "tokio"
    }

    async fn run(
        &self,
        cmd: ToolCommand,
        line_tx: mpsc::Sender<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ProcessOutput, ProcessError> {
        let start = Instant::now();

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = cmd.working_dir {
            command.current_dir(dir);
        }

        debug!(program = %cmd.program, args = ?cmd.args, "Spawning extractor tool");

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::SpawnError {
                    program: cmd.program.clone(),
                    reason: "executable not found".to_string(),
                }
            } else {
                ProcessError::SpawnError {
                    program: cmd.program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let stdout = child.stdout.take().expect("stdout should be captured");
        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_done = false;
        let mut stderr_done = false;

        let mut captured = String::new();
        let deadline = TokioInstant::now() + Duration::from_secs(self.config.job_timeout_secs);

        // Merge both pipes into one ordered-as-observed line stream.
        while !(stdout_done && stderr_done) {
            let line = tokio::select! {
                line = stdout_lines.next_line(), if !stdout_done => {
                    match line? {
                        Some(l) => Some(l),
                        None => {
                            stdout_done = true;
                            None
                        }
                    }
                }
                line = stderr_lines.next_line(), if !stderr_done => {
                    match line? {
                        Some(l) => Some(l),
                        None => {
                            stderr_done = true;
                            None
                        }
                    }
                }
                _ = shutdown.recv() => {
                    warn!(program = %cmd.program, "Interrupted, killing child process");
                    let _ = child.kill().await;
                    return Err(ProcessError::Interrupted {
                        program: cmd.program.clone(),
                    });
                }
                _ = sleep_until(deadline) => {
                    warn!(
                        program = %cmd.program,
                        timeout_secs = self.config.job_timeout_secs,
                        "Wall-clock ceiling hit, killing child process"
                    );
                    let _ = child.kill().await;
                    return Err(ProcessError::Timeout {
                        program: cmd.program.clone(),
                        timeout_secs: self.config.job_timeout_secs,
                    });
                }
            };

            if let Some(line) = line {
                // Progress broadcast happens before the caller sees the line.
                self.progress.broadcast(cmd.correlation_id, &line);
                captured.push_str(&line);
                captured.push('\n');
                // Caller may have stopped listening; the run continues.
                let _ = line_tx.send(line).await;
            }
        }

        let status = child.wait().await?;

        debug!(
            program = %cmd.program,
            exit_code = ?status.code(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extractor tool finished"
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            captured,
            duration: start.elapsed(),
        })
    }

    async fn is_installed(&self, program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn runner() -> TokioProcessRunner {
        let (progress, _rx) = ProgressHandle::channel(64);
        TokioProcessRunner::new(ProcessConfig::default(), progress)
    }

    #[tokio::test]
    async fn test_spawn_missing_executable() {
        let runner = runner();
        let (tx, _rx) = mpsc::channel(8);
        let (_stx, srx) = broadcast::channel(1);
        let cmd = ToolCommand::new("definitely-not-a-real-tool-xyz", vec![], Uuid::new_v4());

        let err = runner.run(cmd, tx, srx).await.unwrap_err();
        assert!(matches!(err, ProcessError::SpawnError { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_captures_merged_output() {
        let runner = runner();
        let (tx, mut rx) = mpsc::channel(64);
        let (_stx, srx) = broadcast::channel(1);
        let cmd = ToolCommand::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo out-line; echo err-line 1>&2".to_string(),
            ],
            Uuid::new_v4(),
        );

        let output = runner.run(cmd, tx, srx).await.unwrap();
        assert!(output.success());
        assert!(output.captured.contains("out-line"));
        assert!(output.captured.contains("err-line"));

        let mut streamed = Vec::new();
        while let Ok(line) = rx.try_recv() {
            streamed.push(line);
        }
        assert!(streamed.iter().any(|l| l == "out-line"));
        assert!(streamed.iter().any(|l| l == "err-line"));
    }

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let runner = runner();
        let (tx, _rx) = mpsc::channel(8);
        let (_stx, srx) = broadcast::channel(1);
        let cmd = ToolCommand::new("sh", vec!["-c".to_string(), "exit 3".to_string()], Uuid::new_v4());

        let output = runner.run(cmd, tx, srx).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_run() {
        let runner = runner();
        let (tx, _rx) = mpsc::channel(8);
        let (stx, srx) = broadcast::channel(1);
        let cmd = ToolCommand::new("sleep", vec!["30".to_string()], Uuid::new_v4());

        let handle = tokio::spawn(async move { runner.run(cmd, tx, srx).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        stx.send(()).unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ProcessError::Interrupted { .. }));
    }

    #[tokio::test]
    async fn test_wall_clock_ceiling() {
        let (progress, _prx) = ProgressHandle::channel(8);
        let runner = TokioProcessRunner::new(ProcessConfig { job_timeout_secs: 1 }, progress);
        let (tx, _rx) = mpsc::channel(8);
        let (_stx, srx) = broadcast::channel(1);
        let cmd = ToolCommand::new("sleep", vec!["30".to_string()], Uuid::new_v4());

        let err = runner.run(cmd, tx, srx).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_is_installed() {
        let runner = runner();
        assert!(runner.is_installed("sh").await);
        assert!(!runner.is_installed("definitely-not-a-real-tool-xyz").await);
    }
}
