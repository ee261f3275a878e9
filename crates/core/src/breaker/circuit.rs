use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics;

/// Circuit breaker tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Number of recent calls considered when computing the failure ratio.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Failure ratio in (0, 1] that trips the breaker open.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f32,
    /// Seconds to stay open before probing with a half-open call.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Consecutive half-open successes required to close again.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_window_size() -> usize {
    10
}

fn default_failure_threshold() -> f32 {
    0.5
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

/// Breaker state as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Result of asking the breaker whether a call may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    ShortCircuited,
}

struct Inner {
    state: BreakerState,
    /// Rolling window of recent call results, true = success.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

/// Per-provider circuit breaker.
///
/// Closed until the failure ratio over a full window crosses the
/// threshold, then open for a cooldown, then half-open until enough
/// consecutive successes close it again. Any half-open failure reopens
/// it immediately.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                half_open_successes: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask whether a call may proceed. An open breaker whose cooldown
    /// has elapsed transitions to half-open and admits the probe.
    pub fn try_acquire(&self) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => Admission::Allowed,
            BreakerState::Open => {
                let cooldown = Duration::from_secs(self.config.cooldown_secs);
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or(cooldown);
                if elapsed >= cooldown {
                    info!(breaker = %self.name, "circuit breaker half-open, probing");
                    self.transition(&mut inner, BreakerState::HalfOpen);
                    inner.half_open_successes = 0;
                    Admission::Allowed
                } else {
                    Admission::ShortCircuited
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => {
                self.push_result(&mut inner, true);
            }
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    info!(breaker = %self.name, "circuit breaker closed");
                    self.transition(&mut inner, BreakerState::Closed);
                    inner.window.clear();
                    inner.opened_at = None;
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => {
                self.push_result(&mut inner, false);
                if inner.window.len() >= self.config.window_size {
                    let failures = inner.window.iter().filter(|ok| !**ok).count();
                    let ratio = failures as f32 / inner.window.len() as f32;
                    if ratio >= self.config.failure_threshold {
                        warn!(
                            breaker = %self.name,
                            failure_ratio = ratio,
                            "circuit breaker opened"
                        );
                        self.transition(&mut inner, BreakerState::Open);
                        inner.opened_at = Some(Instant::now());
                    }
                }
            }
            BreakerState::HalfOpen => {
                warn!(breaker = %self.name, "circuit breaker reopened after probe failure");
                self.transition(&mut inner, BreakerState::Open);
                inner.opened_at = Some(Instant::now());
            }
            BreakerState::Open => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    fn push_result(&self, inner: &mut Inner, ok: bool) {
        inner.window.push_back(ok);
        while inner.window.len() > self.config.window_size {
            inner.window.pop_front();
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        metrics::BREAKER_TRANSITIONS
            .with_label_values(&[&self.name, to.as_str()])
            .inc();
        inner.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(window: usize, threshold: f32, cooldown: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerConfig {
                window_size: window,
                failure_threshold: threshold,
                cooldown_secs: cooldown,
                success_threshold: 2,
            },
        )
    }

    #[test]
    fn test_starts_closed_and_admits() {
        let b = breaker(4, 0.5, 30);
        assert_eq!(b.state(), BreakerState::Closed);
        assert_eq!(b.try_acquire(), Admission::Allowed);
    }

    #[test]
    fn test_opens_after_full_window_of_failures() {
        let b = breaker(4, 0.5, 30);
        b.record_failure();
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Closed);
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
        assert_eq!(b.try_acquire(), Admission::ShortCircuited);
    }

    #[test]
    fn test_does_not_open_below_threshold() {
        let b = breaker(4, 0.75, 30);
        b.record_success();
        b.record_success();
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_partial_window_never_trips() {
        let b = breaker(10, 0.5, 30);
        b.record_failure();
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_after_cooldown_then_closes() {
        let b = breaker(2, 0.5, 0);
        b.record_failure();
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);

        // Zero cooldown: next acquire probes.
        assert_eq!(b.try_acquire(), Admission::Allowed);
        assert_eq!(b.state(), BreakerState::HalfOpen);

        b.record_success();
        assert_eq!(b.state(), BreakerState::HalfOpen);
        b.record_success();
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let b = breaker(2, 0.5, 0);
        b.record_failure();
        b.record_failure();
        assert_eq!(b.try_acquire(), Admission::Allowed);
        b.record_failure();
        assert_eq!(b.state(), BreakerState::Open);
    }
}
