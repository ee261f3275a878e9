//! MusicBrainz recording lookup.
//!
//! MusicBrainz requires:
//! - User-Agent header with application name/version and contact info
//! - Rate limiting: 1 request per second
//!
//! Queries use the structured Lucene field syntax
//! (`artist:"..." AND recording:"..."`) rather than free text, which
//! dramatically improves first-hit precision.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::traits::MetadataProvider;
use super::types::{ProviderOutcome, TrackMetadata};

/// MusicBrainz client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    /// User-Agent string (required by MusicBrainz).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Rate limit delay in milliseconds (default: 1100 for 1 req/sec).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
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

fn default_user_agent() -> String {
    super::client_user_agent()
}

fn default_rate_limit() -> u64 {
    1100
}

fn default_timeout() -> u64 {
    10
}

fn default_base_confidence() -> f32 {
    0.6
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            rate_limit_ms: default_rate_limit(),
            timeout_secs: default_timeout(),
            base_confidence: default_base_confidence(),
            base_url: None,
        }
    }
}

/// MusicBrainz recording client.
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    base_confidence: f32,
    timeout: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    rate_limit: Duration,
}

impl MusicBrainzClient {
    pub fn new(config: MusicBrainzConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://musicbrainz.org/ws/2".to_string());

        Ok(Self {
            client,
            base_url,
            base_confidence: config.base_confidence,
            timeout,
            last_request: Arc::new(Mutex::new(None)),
            rate_limit: Duration::from_millis(config.rate_limit_ms),
        })
    }

    /// Wait for the server-mandated rate limit if needed.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.rate_limit {
                let wait_time = self.rate_limit - elapsed;
                debug!("MusicBrainz rate limit: waiting {:?}", wait_time);
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Build the structured field query.
    fn build_query(artist: &str, title: &str) -> String {
        let escape = |s: &str| s.replace('"', "\\\"");
        format!(
            "artist:\"{}\" AND recording:\"{}\"",
            escape(artist),
            escape(title)
        )
    }
}

#[async_trait::async_trait]
impl MetadataProvider for MusicBrainzClient {
    fn name(&self) -> &str {
        "musicbrainz"
    }

    fn base_confidence(&self) -> f32 {
        self.base_confidence
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderOutcome {
        self.wait_for_rate_limit().await;

        let url = format!("{}/recording", self.base_url);
        let query = Self::build_query(artist, title);
        debug!(query = %query, "MusicBrainz recording search");

        let start = Instant::now();
        let response = match self
            .client
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "5")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!("MusicBrainz request timed out");
                return ProviderOutcome::Timeout {
                    elapsed: start.elapsed().min(self.timeout),
                };
            }
            Err(e) => {
                warn!("MusicBrainz request failed: {}", e);
                return ProviderOutcome::Unavailable { status: None };
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            warn!("MusicBrainz rate limit exceeded");
            return ProviderOutcome::RateLimited { retry_after };
        }
        if !status.is_success() {
            return ProviderOutcome::Unavailable {
                status: Some(status.as_u16()),
            };
        }

        let body: MbSearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to parse MusicBrainz response: {}", e);
                return ProviderOutcome::ParseError;
            }
        };

        let Some(meta) = body
            .recordings
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
// MusicBrainz API response types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct MbSearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct MbRecording {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    length: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    releases: Vec<MbRelease>,
    #[serde(rename = "first-release-date", default)]
    first_release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MbArtistCredit {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artist: Option<MbArtist>,
}

#[derive(Debug, Deserialize)]
struct MbArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MbRelease {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    media: Vec<MbMedium>,
}

#[derive(Debug, Deserialize)]
struct MbMedium {
    #[serde(default)]
    track: Vec<MbTrackPosition>,
}

#[derive(Debug, Deserialize)]
struct MbTrackPosition {
    #[serde(default)]
    position: Option<u32>,
}

impl From<MbRecording> for TrackMetadata {
    fn from(rec: MbRecording) -> Self {
        let artist = rec.artist_credit.first().and_then(|ac| {
            ac.name
                .clone()
                .or_else(|| ac.artist.as_ref().map(|a| a.name.clone()))
        });

        let release = rec.releases.first();
        let album = release.and_then(|r| r.title.clone());
        let release_date = release
            .and_then(|r| r.date.clone())
            .or(rec.first_release_date);
        let track_number = release
            .and_then(|r| r.media.first())
            .and_then(|m| m.track.first())
            .and_then(|t| t.position);

        TrackMetadata {
            artist,
            title: rec.title,
            album,
            release_date,
            track_number,
            genres: Vec::new(),
            album_art_url: None,
            duration_ms: rec.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_escapes_quotes() {
        let q = MusicBrainzClient::build_query(r#"The "Band""#, "Song");
        assert_eq!(q, r#"artist:"The \"Band\"" AND recording:"Song""#);
    }

    #[test]
    fn test_recording_conversion() {
        let json = r#"{
            "title": "Money",
            "length": 382000,
            "artist-credit": [{"name": "Pink Floyd", "artist": {"name": "Pink Floyd"}}],
            "first-release-date": "1973-03-01",
            "releases": [{
                "title": "The Dark Side of the Moon",
                "date": "1973-03-01",
                "media": [{"track": [{"position": 6}]}]
            }]
        }"#;

        let rec: MbRecording = serde_json::from_str(json).unwrap();
        let meta = TrackMetadata::from(rec);

        assert_eq!(meta.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(meta.title.as_deref(), Some("Money"));
        assert_eq!(meta.album.as_deref(), Some("The Dark Side of the Moon"));
        assert_eq!(meta.release_date.as_deref(), Some("1973-03-01"));
        assert_eq!(meta.track_number, Some(6));
        assert_eq!(meta.duration_ms, Some(382000));
        assert!(meta.is_useful());
    }

    #[test]
    fn test_recording_without_releases_uses_first_release_date() {
        let json = r#"{
            "title": "Money",
            "artist-credit": [{"name": "Pink Floyd"}],
            "first-release-date": "1973"
        }"#;

        let rec: MbRecording = serde_json::from_str(json).unwrap();
        let meta = TrackMetadata::from(rec);
        assert_eq!(meta.release_date.as_deref(), Some("1973"));
        assert_eq!(meta.album, None);
    }

    #[test]
    fn test_empty_search_response_parses() {
        let body: MbSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.recordings.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = MusicBrainzConfig::default();
        assert_eq!(config.rate_limit_ms, 1100);
        assert_eq!(config.timeout_secs, 10);
        assert!(config.base_url.is_none());
    }
}
