//! Mock metadata provider for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::providers::{MetadataProvider, ProviderOutcome};

/// Mock implementation of the MetadataProvider trait.
///
/// Outcomes are served from a scripted queue in order; an empty queue
/// yields `NoData`. The call counter lets tests assert how many network
/// calls a wrapper would have made.
pub struct MockProvider {
    name: String,
    base_confidence: f32,
    outcomes: Mutex<VecDeque<ProviderOutcome>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_confidence: 0.6,
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_base_confidence(mut self, base_confidence: f32) -> Self {
        self.base_confidence = base_confidence;
        self
    }

    /// Queue outcomes, served in order.
    pub fn with_outcomes(self, outcomes: Vec<ProviderOutcome>) -> Self {
        self.outcomes.lock().unwrap().extend(outcomes);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_confidence(&self) -> f32 {
        self.base_confidence
    }

    async fn lookup(&self, _artist: &str, _title: &str) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProviderOutcome::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outcomes_served_in_order_then_no_data() {
        let provider = MockProvider::new("mock").with_outcomes(vec![
            ProviderOutcome::ParseError,
            ProviderOutcome::RateLimited { retry_after: None },
        ]);

        assert_eq!(provider.lookup("a", "t").await, ProviderOutcome::ParseError);
        assert_eq!(
            provider.lookup("a", "t").await,
            ProviderOutcome::RateLimited { retry_after: None }
        );
        assert_eq!(provider.lookup("a", "t").await, ProviderOutcome::NoData);
        assert_eq!(provider.call_count(), 3);
    }
}
