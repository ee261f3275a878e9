//! Circuit breaker and retry wrapper for metadata providers.
//!
//! Each provider gets its own breaker. The breaker tracks a rolling
//! window of call results and trips open when the failure ratio crosses
//! a threshold, so a provider outage costs one short-circuit check per
//! lookup instead of a timeout.

mod circuit;
mod guarded;

pub use circuit::{Admission, BreakerConfig, BreakerState, CircuitBreaker};
pub use guarded::{GuardedProvider, RetryConfig};
