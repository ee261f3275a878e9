//! iTunes Search API lookup.
//!
//! Last in the provider chain. Mostly valuable as an album-art fallback:
//! the artworkUrl100 it returns can be rewritten to a higher resolution
//! by swapping the dimension segment.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::MetadataProvider;
use super::types::{ProviderOutcome, TrackMetadata};

/// iTunes client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItunesConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Base confidence contributed by this provider.
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f32,
    /// Base URL override (used by tests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_timeout() -> u64 {
    10
}

fn default_base_confidence() -> f32 {
    0.4
}

impl Default for ItunesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            base_confidence: default_base_confidence(),
            base_url: None,
        }
    }
}

/// iTunes Search API client.
pub struct ItunesClient {
    client: Client,
    base_url: String,
    base_confidence: f32,
    timeout: Duration,
}

impl ItunesClient {
    pub fn new(config: ItunesConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(super::client_user_agent())
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://itunes.apple.com".to_string());

        Ok(Self {
            client,
            base_url,
            base_confidence: config.base_confidence,
            timeout,
        })
    }

    /// Upgrade the thumbnail URL iTunes returns to a 600x600 variant.
    fn upscale_artwork(url: &str) -> String {
        url.replace("100x100bb", "600x600bb")
    }
}

#[async_trait::async_trait]
impl MetadataProvider for ItunesClient {
    fn name(&self) -> &str {
        "itunes"
    }

    fn base_confidence(&self) -> f32 {
        self.base_confidence
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderOutcome {
        let url = format!("{}/search", self.base_url);
        let term = format!("{} {}", artist, title);
        debug!(term = %term, "iTunes song search");

        let start = Instant::now();
        let response = match self
            .client
            .get(&url)
            .query(&[
                ("term", term.as_str()),
                ("entity", "song"),
                ("limit", "5"),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!("iTunes request timed out");
                return ProviderOutcome::Timeout {
                    elapsed: start.elapsed().min(self.timeout),
                };
            }
            Err(e) => {
                warn!("iTunes request failed: {}", e);
                return ProviderOutcome::Unavailable { status: None };
            }
        };

        let status = response.status();
        // iTunes throttles with 403 as well as 429.
        if status.as_u16() == 429 || status.as_u16() == 403 {
            warn!("iTunes rate limit exceeded");
            return ProviderOutcome::RateLimited { retry_after: None };
        }
        if !status.is_success() {
            return ProviderOutcome::Unavailable {
                status: Some(status.as_u16()),
            };
        }

        let body: ItunesSearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to parse iTunes response: {}", e);
                return ProviderOutcome::ParseError;
            }
        };

        let Some(meta) = body
            .results
            .into_iter()
            .map(TrackMetadata::from)
            .find(|m| m.is_useful())
        else {
            return ProviderOutcome::NoData;
        };

        ProviderOutcome::Success(meta)
    }
}

// ============================================================================
// iTunes API response types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ItunesSearchResponse {
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesTrack {
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    collection_name: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    track_number: Option<u32>,
    #[serde(default)]
    primary_genre_name: Option<String>,
    #[serde(default)]
    artwork_url100: Option<String>,
    #[serde(default)]
    track_time_millis: Option<u64>,
}

impl From<ItunesTrack> for TrackMetadata {
    fn from(track: ItunesTrack) -> Self {
        TrackMetadata {
            artist: track.artist_name,
            title: track.track_name,
            album: track.collection_name,
            release_date: track.release_date,
            track_number: track.track_number,
            genres: track.primary_genre_name.into_iter().collect(),
            album_art_url: track
                .artwork_url100
                .as_deref()
                .map(ItunesClient::upscale_artwork),
            duration_ms: track.track_time_millis,
        }
    }
}
