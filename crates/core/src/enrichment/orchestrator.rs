use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::breaker::{BreakerConfig, BreakerState, CircuitBreaker, GuardedProvider, RetryConfig};
use crate::metrics;
use crate::output;
use crate::providers::{
    is_placeholder, DeezerClient, DeezerConfig, ItunesClient, ItunesConfig, MusicBrainzClient,
    MusicBrainzConfig, ProviderOutcome,
};

use super::merge::{EnrichedMetadata, MergeState};

/// Enrichment configuration, one subsection per provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnricherConfig {
    #[serde(default)]
    pub musicbrainz: MusicBrainzConfig,
    #[serde(default)]
    pub deezer: DeezerConfig,
    #[serde(default)]
    pub itunes: ItunesConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Drives the provider chain for one track and merges the results.
pub struct Enricher {
    /// Providers in priority order.
    primary: Vec<GuardedProvider>,
    /// Consulted only when the merged result still has no album art.
    art_fallback: Option<GuardedProvider>,
}

impl Enricher {
    pub fn new(config: EnricherConfig) -> Result<Self, reqwest::Error> {
        let guard = |provider: Arc<dyn crate::providers::MetadataProvider>| {
            let name = provider.name().to_string();
            GuardedProvider::new(
                provider,
                CircuitBreaker::new(name, config.breaker.clone()),
                config.retry.clone(),
            )
        };

        let musicbrainz = Arc::new(MusicBrainzClient::new(config.musicbrainz.clone())?);
        let deezer = Arc::new(DeezerClient::new(config.deezer.clone())?);
        let itunes = Arc::new(ItunesClient::new(config.itunes.clone())?);

        Ok(Self {
            primary: vec![guard(musicbrainz), guard(deezer)],
            art_fallback: Some(guard(itunes)),
        })
    }

    /// Build an enricher from pre-assembled providers. Used by tests.
    pub fn from_parts(
        primary: Vec<GuardedProvider>,
        art_fallback: Option<GuardedProvider>,
    ) -> Self {
        Self {
            primary,
            art_fallback,
        }
    }

    fn all_breakers_open(&self) -> bool {
        self.primary
            .iter()
            .chain(self.art_fallback.iter())
            .all(|p| p.breaker_state() == BreakerState::Open)
    }

    /// Run the full provider chain for one (artist, title) pair.
    ///
    /// A placeholder artist paired with an `Artist - Title` shaped title
    /// is split before querying, since extractors often stuff the whole
    /// credit into the title field.
    pub async fn enrich(&self, artist: &str, title: &str) -> EnrichedMetadata {
        let start = Instant::now();

        let (artist, title) = resolve_query(artist, title);
        debug!(artist = %artist, title = %title, "enriching track");

        let mut state = MergeState::new();

        if self.all_breakers_open() {
            info!(
                artist = %artist,
                title = %title,
                "skipping enrichment, all provider breakers open"
            );
            for provider in self.primary.iter().chain(self.art_fallback.iter()) {
                state.record_outcome(provider.name(), "short_circuited");
            }
            return state.finish();
        }

        for provider in &self.primary {
            let outcome = provider.lookup(&artist, &title).await;
            state.record_outcome(provider.name(), outcome.label());
            if let ProviderOutcome::Success(meta) = outcome {
                state.apply(provider.name(), provider.base_confidence(), meta);
            }
        }

        if !state.has_art() {
            if let Some(provider) = &self.art_fallback {
                let outcome = provider.lookup(&artist, &title).await;
                state.record_outcome(provider.name(), outcome.label());
                if let ProviderOutcome::Success(meta) = outcome {
                    state.apply(provider.name(), provider.base_confidence(), meta);
                }
            }
        }

        let merged = state.finish();

        metrics::ENRICHMENT_DURATION.observe(start.elapsed().as_secs_f64());
        metrics::ENRICHMENT_CONFIDENCE.observe(merged.confidence as f64);
        if merged.improved_artist(artist.as_str()) {
            debug!(
                artist = %artist,
                enriched = ?merged.artist,
                "enrichment improved placeholder artist"
            );
        }

        merged
    }
}

/// Split `Artist - Title` out of the title when the artist field is a
/// placeholder. Otherwise pass both through unchanged.
fn resolve_query(artist: &str, title: &str) -> (String, String) {
    if is_placeholder(artist) {
        let (split_artist, split_title) = output::split_artist_title(title);
        if !split_artist.is_empty() {
            return (split_artist, split_title);
        }
    }
    (artist.to_string(), title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MetadataProvider, TrackMetadata};
    use crate::testing::MockProvider;

    fn guarded(provider: Arc<MockProvider>) -> GuardedProvider {
        let name = provider.name().to_string();
        GuardedProvider::new(
            provider,
            CircuitBreaker::new(name, BreakerConfig::default()),
            RetryConfig {
                max_attempts: 1,
                delay_ms: 1,
                jitter_ms: 0,
            },
        )
    }

    fn success_meta(artist: &str) -> ProviderOutcome {
        ProviderOutcome::Success(TrackMetadata {
            artist: Some(artist.to_string()),
            title: Some("Money".into()),
            album: Some("The Dark Side of the Moon".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_resolve_query_splits_placeholder_artist() {
        let (artist, title) = resolve_query("Unknown Artist", "Pink Floyd - Money");
        assert_eq!(artist, "Pink Floyd");
        assert_eq!(title, "Money");
    }

    #[test]
    fn test_resolve_query_keeps_real_artist() {
        let (artist, title) = resolve_query("Pink Floyd", "Money - Live");
        assert_eq!(artist, "Pink Floyd");
        assert_eq!(title, "Money - Live");
    }

    #[tokio::test]
    async fn test_providers_called_in_priority_order() {
        let first = Arc::new(MockProvider::new("first").with_outcomes(vec![success_meta(
            "Pink Floyd",
        )]));
        let second = Arc::new(
            MockProvider::new("second").with_outcomes(vec![success_meta("Pink Floyd")]),
        );
        let enricher =
            Enricher::from_parts(vec![guarded(first.clone()), guarded(second.clone())], None);

        let merged = enricher.enrich("Pink Floyd", "Money").await;
        assert_eq!(merged.providers.first().map(String::as_str), Some("first"));
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 1);
    }

    #[tokio::test]
    async fn test_art_fallback_skipped_when_art_present() {
        let mut meta = TrackMetadata {
            artist: Some("Pink Floyd".into()),
            title: Some("Money".into()),
            ..Default::default()
        };
        meta.album_art_url = Some("https://example.com/cover.jpg".into());
        let primary = Arc::new(
            MockProvider::new("deezer").with_outcomes(vec![ProviderOutcome::Success(meta)]),
        );
        let art = Arc::new(MockProvider::new("itunes").with_outcomes(vec![success_meta(
            "Pink Floyd",
        )]));

        let enricher =
            Enricher::from_parts(vec![guarded(primary)], Some(guarded(art.clone())));
        let merged = enricher.enrich("Pink Floyd", "Money").await;

        assert!(merged.album_art_url.is_some());
        assert_eq!(art.call_count(), 0);
    }

    #[tokio::test]
    async fn test_art_fallback_called_when_art_missing() {
        let primary = Arc::new(MockProvider::new("musicbrainz").with_outcomes(vec![
            success_meta("Pink Floyd"),
        ]));
        let mut art_meta = TrackMetadata::default();
        art_meta.album_art_url = Some("https://example.com/cover.jpg".into());
        art_meta.artist = Some("Pink Floyd".into());
        art_meta.title = Some("Money".into());
        let art = Arc::new(MockProvider::new("itunes").with_outcomes(vec![
            ProviderOutcome::Success(art_meta),
        ]));

        let enricher =
            Enricher::from_parts(vec![guarded(primary)], Some(guarded(art.clone())));
        let merged = enricher.enrich("Pink Floyd", "Money").await;

        assert_eq!(art.call_count(), 1);
        assert_eq!(
            merged.album_art_url.as_deref(),
            Some("https://example.com/cover.jpg")
        );
    }

    #[tokio::test]
    async fn test_no_data_everywhere_yields_empty_result() {
        let first = Arc::new(
            MockProvider::new("musicbrainz").with_outcomes(vec![ProviderOutcome::NoData]),
        );
        let second =
            Arc::new(MockProvider::new("deezer").with_outcomes(vec![ProviderOutcome::NoData]));

        let enricher = Enricher::from_parts(vec![guarded(first), guarded(second)], None);
        let merged = enricher.enrich("Pink Floyd", "Money").await;

        assert!(merged.providers.is_empty());
        assert_eq!(merged.confidence, 0.0);
        assert_eq!(merged.outcomes.len(), 2);
        assert!(merged.outcomes.iter().all(|(_, label)| label == "no_data"));
    }
}
