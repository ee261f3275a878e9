//! Trait definitions for metadata providers.

use async_trait::async_trait;

use super::types::ProviderOutcome;

/// A single external metadata source.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logs, metrics and provenance.
    fn name(&self) -> &str;

    /// Base confidence contributed when this provider supplies fields.
    fn base_confidence(&self) -> f32;

    /// Query the provider once for the given track.
    ///
    /// All failure modes are folded into [`ProviderOutcome`]; this call
    /// never returns an error.
    async fn lookup(&self, artist: &str, title: &str) -> ProviderOutcome;
}
