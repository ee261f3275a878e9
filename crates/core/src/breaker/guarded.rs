use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::metrics;
use crate::providers::{MetadataProvider, ProviderOutcome};

use super::circuit::{Admission, BreakerState, CircuitBreaker};

/// Retry tuning for a guarded provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per lookup, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Extra random delay added on top, 0..=jitter_ms.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

fn default_jitter_ms() -> u64 {
    250
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

/// A metadata provider behind a circuit breaker and a bounded retry loop.
///
/// Transient failures (Unavailable, Timeout, ParseError) are retried with
/// a fixed delay plus jitter and fed to the breaker. RateLimited is
/// surfaced to the caller immediately and never retried here, since the
/// right reaction is backing off far longer than a lookup should take.
pub struct GuardedProvider {
    provider: Arc<dyn MetadataProvider>,
    breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl GuardedProvider {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        breaker: CircuitBreaker,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            breaker,
            retry,
        }
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    pub fn base_confidence(&self) -> f32 {
        self.provider.base_confidence()
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    pub async fn lookup(&self, artist: &str, title: &str) -> ProviderOutcome {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.breaker.try_acquire() == Admission::ShortCircuited {
                debug!(provider = %self.name(), "lookup short-circuited, breaker open");
                metrics::PROVIDER_CALLS
                    .with_label_values(&[self.name(), "short_circuited"])
                    .inc();
                return ProviderOutcome::Unavailable { status: None };
            }

            let outcome = self.provider.lookup(artist, title).await;
            metrics::PROVIDER_CALLS
                .with_label_values(&[self.name(), outcome.label()])
                .inc();

            if outcome.is_breaker_failure() {
                self.breaker.record_failure();
            } else {
                self.breaker.record_success();
            }

            match &outcome {
                ProviderOutcome::Success(_) | ProviderOutcome::NoData => return outcome,
                ProviderOutcome::RateLimited { .. } => {
                    warn!(provider = %self.name(), "provider rate limited");
                    return outcome;
                }
                ProviderOutcome::Unavailable { .. }
                | ProviderOutcome::Timeout { .. }
                | ProviderOutcome::ParseError => {
                    if attempt == max_attempts {
                        return outcome;
                    }
                    let jitter = if self.retry.jitter_ms > 0 {
                        rand::thread_rng().gen_range(0..=self.retry.jitter_ms)
                    } else {
                        0
                    };
                    let delay = Duration::from_millis(self.retry.delay_ms + jitter);
                    debug!(
                        provider = %self.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying provider lookup"
                    );
                    sleep(delay).await;
                }
            }
        }

        // Loop always returns from the final attempt.
        unreachable!("retry loop exhausted without returning")
    }
}
