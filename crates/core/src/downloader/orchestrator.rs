use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::output::{self, LineEvent};
use crate::process::ProcessRunner;

use super::command::{build_command, DownloaderConfig};
use super::policy::{AttemptSummary, Decision, RetryPolicy};
use super::single_flight::SingleFlight;
use super::types::{
    AcquireError, AcquisitionRequest, AcquisitionResult, RequestKind, ToolSource,
};

/// Everything recognized in one tool run's output.
#[derive(Debug, Default)]
struct AttemptEvents {
    files: Vec<String>,
    skipped: Vec<(String, String)>,
    rate_limited: bool,
    reported_wait: Option<Duration>,
}

/// Drives one acquisition job: tool selection, the retry/fallback loop,
/// and post-run disk verification.
pub struct Downloader {
    runner: Arc<dyn ProcessRunner>,
    config: DownloaderConfig,
    single_flight: SingleFlight,
    shutdown: broadcast::Sender<()>,
}

impl Downloader {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        config: DownloaderConfig,
        single_flight: SingleFlight,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            runner,
            config,
            single_flight,
            shutdown,
        }
    }

    /// Run one acquisition job to completion.
    ///
    /// Rejects synchronously with `AlreadyInProgress` while another job
    /// holds the single-flight guard. The guard is released on every
    /// exit path, including errors and interruption.
    pub async fn acquire(
        &self,
        request: AcquisitionRequest,
    ) -> Result<AcquisitionResult, AcquireError> {
        let _guard = self
            .single_flight
            .try_acquire()
            .ok_or(AcquireError::AlreadyInProgress)?;

        let start = Instant::now();
        let result = self.run_job(&request).await;

        let label = match &result {
            Ok(_) => "ok",
            Err(AcquireError::AlreadyInProgress) => "already_in_progress",
            Err(AcquireError::ToolMissing { .. }) => "tool_missing",
            Err(AcquireError::Spawn { .. }) => "spawn_error",
            Err(AcquireError::Interrupted) => "interrupted",
            Err(AcquireError::Timeout { .. }) => "timeout",
            Err(AcquireError::NoSongsProcessed) => "no_songs_processed",
            Err(AcquireError::Io(_)) => "io_error",
        };
        metrics::ACQUISITION_ATTEMPTS.with_label_values(&[label]).inc();
        metrics::ACQUISITION_DURATION.observe(start.elapsed().as_secs_f64());

        result
    }

    async fn run_job(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<AcquisitionResult, AcquireError> {
        let kind = request.kind();
        let mut source = match kind {
            RequestKind::SearchQuery | RequestKind::SpotifyUrl => ToolSource::SpotDl,
            RequestKind::VideoUrl => ToolSource::YtDlp,
        };

        if !self.runner.is_installed(source.program()).await {
            return Err(AcquireError::ToolMissing {
                tool: source.program().to_string(),
            });
        }

        info!(
            query = %request.query,
            source = source.as_str(),
            correlation_id = %request.correlation_id,
            "starting acquisition"
        );

        let mut policy = RetryPolicy::new(kind, self.config.clone());
        let mut reported_files: Vec<String> = Vec::new();
        let mut skipped: Vec<(String, String)> = Vec::new();
        let mut output_log = String::new();
        let mut query_override: Option<String> = None;
        let mut last_exit_ok;

        loop {
            let command = build_command(
                request,
                &self.config,
                source,
                policy.single_thread(),
                query_override.as_deref(),
            );
            debug!(program = %command.program, args = ?command.args, "invoking extractor");

            let (line_tx, line_rx) = mpsc::channel(256);
            let collector = tokio::spawn(collect_events(line_rx));

            let run = self
                .runner
                .run(command, line_tx, self.shutdown.subscribe())
                .await;

            let events = collector.await.unwrap_or_default();
            let output = run?;

            if !output_log.is_empty() {
                output_log.push('\n');
            }
            output_log.push_str(&output.captured);

            let summary = AttemptSummary {
                exit_ok: output.success(),
                files: events.files.len(),
                duplicates: events.skipped.len(),
                rate_limited: events.rate_limited,
                reported_wait: events.reported_wait,
            };
            reported_files.extend(events.files);
            skipped.extend(events.skipped);
            last_exit_ok = summary.exit_ok;

            match policy.decide(&summary) {
                Decision::Done => break,
                Decision::RetryRateLimited { wait } => {
                    metrics::RATE_LIMIT_HITS.inc();
                    warn!(wait_secs = wait.as_secs(), "rate limited, cooling down");
                    self.interruptible_sleep(wait).await?;
                }
                Decision::RetryTransient { wait } => {
                    debug!(wait_secs = wait.as_secs(), "retrying after transient failure");
                    self.interruptible_sleep(wait).await?;
                }
                Decision::SourceFallback => {
                    let next = match source {
                        ToolSource::SpotDl | ToolSource::SpotDlFallback => ToolSource::YtDlp,
                        ToolSource::YtDlp => ToolSource::SpotDlFallback,
                    };
                    // spotdl cannot consume a bare video URL; the
                    // fallback runs as a search with terms recovered
                    // from the earlier attempts' output.
                    if next == ToolSource::SpotDlFallback && kind == RequestKind::VideoUrl {
                        match fallback_search_terms(&reported_files, &skipped) {
                            Some(terms) => query_override = Some(terms),
                            None => {
                                warn!("no search terms recoverable, skipping fallback");
                                if reported_files.is_empty() && skipped.is_empty() {
                                    return Err(AcquireError::NoSongsProcessed);
                                }
                                break;
                            }
                        }
                    }
                    if !self.runner.is_installed(next.program()).await {
                        warn!(tool = next.program(), "fallback tool not installed");
                        if reported_files.is_empty() && skipped.is_empty() {
                            return Err(AcquireError::ToolMissing {
                                tool: next.program().to_string(),
                            });
                        }
                        break;
                    }
                    metrics::SOURCE_FALLBACKS.inc();
                    info!(from = source.as_str(), to = next.as_str(), "switching source");
                    source = next;
                    policy.note_fallback(RequestKind::SearchQuery);
                }
                Decision::Fail => {
                    if reported_files.is_empty() && skipped.is_empty() {
                        return Err(AcquireError::NoSongsProcessed);
                    }
                    break;
                }
            }
        }

        let (downloaded_files, skipped_or_missing) = self
            .verify_on_disk(&request.output_dir, &request.format, reported_files)
            .await;

        let mut unprocessed = Vec::new();
        if !last_exit_ok {
            unprocessed.push(request.query.clone());
        }

        info!(
            downloaded = downloaded_files.len(),
            skipped = skipped.len(),
            missing = skipped_or_missing.len(),
            source = source.as_str(),
            "acquisition finished"
        );

        Ok(AcquisitionResult {
            downloaded_files,
            skipped,
            skipped_or_missing,
            unprocessed,
            output_log,
            source,
        })
    }

    /// Only paths that actually exist post-run count as downloaded.
    ///
    /// Some tool output reports a bare track credit rather than a file
    /// name, so a path that is not on disk as-is gets a second chance
    /// with the requested format appended.
    async fn verify_on_disk(
        &self,
        output_dir: &std::path::Path,
        format: &str,
        reported: Vec<String>,
    ) -> (Vec<PathBuf>, Vec<String>) {
        let mut downloaded = Vec::new();
        let mut missing = Vec::new();

        for file in reported {
            let path = PathBuf::from(&file);
            let path = if path.is_absolute() {
                path
            } else {
                output_dir.join(path)
            };
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                downloaded.push(path);
                continue;
            }
            let with_format = PathBuf::from(format!("{}.{}", path.display(), format));
            if tokio::fs::try_exists(&with_format).await.unwrap_or(false) {
                downloaded.push(with_format);
                continue;
            }
            debug!(file = %file, "reported file not found on disk");
            missing.push(file);
        }

        (downloaded, missing)
    }

    async fn interruptible_sleep(&self, wait: Duration) -> Result<(), AcquireError> {
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            _ = sleep(wait) => Ok(()),
            _ = shutdown.recv() => Err(AcquireError::Interrupted),
        }
    }
}

/// Search terms for a spotdl fallback after a failed video-URL job,
/// recovered from whatever the earlier attempts recognized.
fn fallback_search_terms(files: &[String], skipped: &[(String, String)]) -> Option<String> {
    if let Some(stem) = files
        .first()
        .and_then(|f| std::path::Path::new(f).file_stem())
    {
        return Some(stem.to_string_lossy().into_owned());
    }
    skipped
        .first()
        .map(|(artist, title)| format!("{} {}", artist, title))
}

async fn collect_events(mut rx: mpsc::Receiver<String>) -> AttemptEvents {
    let mut events = AttemptEvents::default();
    while let Some(line) = rx.recv().await {
        match output::classify(&line) {
            LineEvent::Downloaded(file) => events.files.push(file),
            LineEvent::SkippedDuplicate { artist, title } => {
                events.skipped.push((artist, title));
            }
            LineEvent::RateLimitHit(wait) => {
                events.rate_limited = true;
                if events.reported_wait.is_none() {
                    events.reported_wait = wait;
                }
            }
            LineEvent::Unrecognized => {}
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProcessRunner;

    fn downloader(runner: MockProcessRunner) -> (Downloader, SingleFlight) {
        let flight = SingleFlight::new();
        let (shutdown_tx, _) = broadcast::channel(1);
        let downloader = Downloader::new(
            Arc::new(runner),
            DownloaderConfig::default(),
            flight.clone(),
            shutdown_tx,
        );
        (downloader, flight)
    }

    fn request_in(dir: &std::path::Path, query: &str) -> AcquisitionRequest {
        AcquisitionRequest::new(query, dir)
    }

    #[tokio::test]
    async fn test_successful_run_verifies_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("Pink Floyd - Money.mp3");
        std::fs::write(&on_disk, b"audio").unwrap();

        let runner = MockProcessRunner::new().with_run(
            vec![
                "[download] Destination: Pink Floyd - Money.mp3".to_string(),
                "[download] Destination: Missing - Track.mp3".to_string(),
            ],
            0,
        );
        let (downloader, _) = downloader(runner);

        let result = downloader
            .acquire(request_in(dir.path(), "pink floyd money"))
            .await
            .unwrap();

        assert_eq!(result.downloaded_files, vec![on_disk]);
        assert_eq!(result.skipped_or_missing, vec!["Missing - Track.mp3"]);
        assert_eq!(result.source, ToolSource::SpotDl);
        assert!(result.unprocessed.is_empty());
    }

    #[tokio::test]
    async fn test_spotdl_credit_line_resolves_with_format_extension() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("Pink Floyd - Money.mp3");
        std::fs::write(&on_disk, b"audio").unwrap();

        let runner = MockProcessRunner::new().with_run(
            vec![
                r#"Downloaded "Pink Floyd - Money": https://music.youtube.com/watch?v=abc123"#
                    .to_string(),
            ],
            0,
        );
        let (downloader, _) = downloader(runner);

        let result = downloader
            .acquire(request_in(dir.path(), "pink floyd money"))
            .await
            .unwrap();

        assert_eq!(result.downloaded_files, vec![on_disk]);
        assert!(result.skipped_or_missing.is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_collected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockProcessRunner::new().with_run(
            vec![
                r#"Skipping "Pink Floyd - Money (2011 Remaster)" as it's already downloaded"#
                    .to_string(),
            ],
            0,
        );
        let (downloader, _) = downloader(runner);

        let result = downloader
            .acquire(request_in(dir.path(), "pink floyd money"))
            .await
            .unwrap();

        assert_eq!(
            result.skipped,
            vec![("Pink Floyd".to_string(), "Money".to_string())]
        );
    }

    #[tokio::test]
    async fn test_second_acquire_rejected_while_guard_held() {
        let dir = tempfile::tempdir().unwrap();
        let (downloader, flight) = downloader(MockProcessRunner::new());

        let _held = flight.try_acquire().unwrap();
        let err = downloader
            .acquire(request_in(dir.path(), "query"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::AlreadyInProgress));
    }

    #[tokio::test]
    async fn test_tool_missing_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockProcessRunner::new().with_installed(false);
        let (downloader, _) = downloader(runner);

        let err = downloader
            .acquire(request_in(dir.path(), "query"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::ToolMissing { tool } if tool == "spotdl"));
    }

    #[tokio::test]
    async fn test_empty_failed_search_falls_back_to_ytdlp_once() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("Pink Floyd - Money.mp3");
        std::fs::write(&on_disk, b"audio").unwrap();

        let runner = MockProcessRunner::new()
            .with_run(vec![], 1)
            .with_run(
                vec!["[ExtractAudio] Destination: Pink Floyd - Money.mp3".to_string()],
                0,
            );
        let (downloader, _) = downloader(runner.clone());

        let result = downloader
            .acquire(request_in(dir.path(), "pink floyd money"))
            .await
            .unwrap();

        assert_eq!(result.source, ToolSource::YtDlp);
        assert_eq!(result.downloaded_files, vec![on_disk]);

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].program, "spotdl");
        assert_eq!(commands[1].program, "yt-dlp");
    }

    #[tokio::test]
    async fn test_no_songs_processed_after_exhausted_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockProcessRunner::new().with_run(vec![], 1).with_run(vec![], 1);
        let (downloader, _) = downloader(runner.clone());

        let err = downloader
            .acquire(request_in(dir.path(), "no such song"))
            .await
            .unwrap_err();
        assert!(matches!(err, AcquireError::NoSongsProcessed));
        assert_eq!(runner.commands().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_retry_forces_single_thread() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = dir.path().join("a.mp3");
        std::fs::write(&on_disk, b"audio").unwrap();

        let runner = MockProcessRunner::new()
            .with_run(
                vec![
                    "[download] Destination: a.mp3".to_string(),
                    "Your application has reached a rate/request limit. Retry will occur after: 45 s"
                        .to_string(),
                ],
                1,
            )
            .with_run(vec![], 0);
        let (downloader, _) = downloader(runner.clone());

        let result = downloader
            .acquire(request_in(dir.path(), "some playlist"))
            .await
            .unwrap();

        assert_eq!(result.downloaded_files, vec![on_disk]);

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        let threads_idx = commands[1]
            .args
            .iter()
            .position(|a| a == "--download-threads")
            .unwrap();
        assert_eq!(commands[1].args[threads_idx + 1], "1");
    }

    #[tokio::test]
    async fn test_guard_released_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockProcessRunner::new().with_installed(false);
        let (downloader, flight) = downloader(runner);

        let _ = downloader.acquire(request_in(dir.path(), "query")).await;
        assert!(!flight.is_busy());
    }
}
