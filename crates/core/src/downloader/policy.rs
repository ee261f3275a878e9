use std::time::Duration;

use super::command::DownloaderConfig;
use super::types::RequestKind;

/// What one tool run looked like, as seen by the policy.
#[derive(Debug, Clone, Copy)]
pub struct AttemptSummary {
    pub exit_ok: bool,
    /// Files reported downloaded in this attempt.
    pub files: usize,
    /// Already-present duplicates recognized in this attempt.
    pub duplicates: usize,
    pub rate_limited: bool,
    /// Wait the tool asked for, when it named one.
    pub reported_wait: Option<Duration>,
}

impl AttemptSummary {
    fn recognized_anything(&self) -> bool {
        self.files > 0 || self.duplicates > 0
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Return the accumulated result to the caller.
    Done,
    /// Wait, then re-invoke with concurrency forced to 1.
    RetryRateLimited { wait: Duration },
    /// Wait briefly, then re-invoke unchanged.
    RetryTransient { wait: Duration },
    /// Switch to the alternate extractor. At most once per job.
    SourceFallback,
    /// The job produced nothing and no fallback remains.
    Fail,
}

/// Bounded retry/fallback state machine for one acquisition job.
///
/// An explicit loop over attempt counters, never recursion, so the
/// retry ceiling is directly testable. Partial results are never
/// discarded: any attempt that recognized output ends in `Done`, not
/// `Fail`.
#[derive(Debug)]
pub struct RetryPolicy {
    kind: RequestKind,
    config: DownloaderConfig,
    rate_limit_retries: u32,
    video_attempts: u32,
    fallback_used: bool,
    single_thread: bool,
}

impl RetryPolicy {
    pub fn new(kind: RequestKind, config: DownloaderConfig) -> Self {
        Self {
            kind,
            config,
            rate_limit_retries: 0,
            video_attempts: 0,
            fallback_used: false,
            single_thread: false,
        }
    }

    /// Whether subsequent invocations should force concurrency to 1.
    pub fn single_thread(&self) -> bool {
        self.single_thread
    }

    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    /// After the source switches, the policy tracks the new source's
    /// query shape and starts its counters fresh.
    pub fn note_fallback(&mut self, new_kind: RequestKind) {
        self.fallback_used = true;
        self.kind = new_kind;
        self.rate_limit_retries = 0;
        self.video_attempts = 0;
    }

    pub fn decide(&mut self, summary: &AttemptSummary) -> Decision {
        if summary.exit_ok {
            return Decision::Done;
        }

        // Direct video URLs get their own bounded retry ladder before
        // falling back to a search through the other tool.
        if self.kind == RequestKind::VideoUrl {
            return self.decide_video(summary);
        }

        if !summary.recognized_anything() {
            if self.kind == RequestKind::SearchQuery && !self.fallback_used {
                return Decision::SourceFallback;
            }
            return Decision::Fail;
        }

        // Partial progress plus rate-limit text: cool down and resume
        // with reduced concurrency, keeping what we have.
        if summary.rate_limited && self.rate_limit_retries < self.config.max_rate_limit_retries {
            self.rate_limit_retries += 1;
            self.single_thread = true;
            let wait = summary
                .reported_wait
                .unwrap_or(Duration::from_secs(self.config.rate_limit_wait_secs));
            return Decision::RetryRateLimited { wait };
        }

        // Failed but accumulated output: return the partial result.
        Decision::Done
    }

    fn decide_video(&mut self, summary: &AttemptSummary) -> Decision {
        if self.video_attempts < self.config.video_retries {
            self.video_attempts += 1;
            let wait = if summary.rate_limited {
                summary
                    .reported_wait
                    .unwrap_or(Duration::from_secs(self.config.video_rate_limit_wait_secs))
            } else {
                Duration::from_secs(self.config.video_retry_wait_secs)
            };
            return if summary.rate_limited {
                Decision::RetryRateLimited { wait }
            } else {
                Decision::RetryTransient { wait }
            };
        }

        if !self.fallback_used {
            return Decision::SourceFallback;
        }

        if summary.recognized_anything() {
            Decision::Done
        } else {
            Decision::Fail
        }
    }
}
