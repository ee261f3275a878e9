//! Deezer track lookup.
//!
//! Deezer's search endpoint needs no API key and carries the genre and
//! album-art data the other providers lack. Genres live on the album
//! resource, so a successful track hit is followed by an album fetch.
//!
//! Search precision varies with phrasing, so the lookup walks a list of
//! query permutations and stops at the first one that returns results.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::MetadataProvider;
use super::types::{ProviderOutcome, TrackMetadata};

/// Deezer client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeezerConfig {
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
    0.5
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            base_confidence: default_base_confidence(),
            base_url: None,
        }
    }
}

/// Deezer track client.
pub struct DeezerClient {
    client: Client,
    base_url: String,
    base_confidence: f32,
    timeout: Duration,
}

impl DeezerClient {
    pub fn new(config: DeezerConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(super::client_user_agent())
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| "https://api.deezer.com".to_string());

        Ok(Self {
            client,
            base_url,
            base_confidence: config.base_confidence,
            timeout,
        })
    }

    /// Query phrasings in decreasing order of precision.
    fn query_permutations(artist: &str, title: &str) -> Vec<String> {
        vec![
            format!("{} {}", artist, title),
            format!("{} - {}", artist, title),
            format!("{} {}", title, artist),
        ]
    }

    async fn search(&self, query: &str) -> Result<Vec<DeezerTrack>, ProviderOutcome> {
        let url = format!("{}/search", self.base_url);

        let start = Instant::now();
        let response = match self.client.get(&url).query(&[("q", query)]).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!("Deezer request timed out");
                return Err(ProviderOutcome::Timeout {
                    elapsed: start.elapsed().min(self.timeout),
                });
            }
            Err(e) => {
                warn!("Deezer request failed: {}", e);
                return Err(ProviderOutcome::Unavailable { status: None });
            }
        };

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderOutcome::RateLimited { retry_after: None });
        }
        if !status.is_success() {
            return Err(ProviderOutcome::Unavailable {
                status: Some(status.as_u16()),
            });
        }

        let body: DeezerSearchResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to parse Deezer response: {}", e);
                return Err(ProviderOutcome::ParseError);
            }
        };

        // Deezer reports quota errors inside a 200 body.
        if let Some(err) = body.error {
            if err.code == Some(4) {
                return Err(ProviderOutcome::RateLimited { retry_after: None });
            }
            return Err(ProviderOutcome::Unavailable { status: None });
        }

        Ok(body.data)
    }

    /// Fetch album genres, best effort. A failed album fetch never fails
    /// the lookup as a whole.
    async fn album_genres(&self, album_id: u64) -> Vec<String> {
        let url = format!("{}/album/{}", self.base_url, album_id);

        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(status = %r.status(), "Deezer album fetch failed");
                return Vec::new();
            }
            Err(e) => {
                debug!("Deezer album fetch failed: {}", e);
                return Vec::new();
            }
        };

        match response.json::<DeezerAlbum>().await {
            Ok(album) => album
                .genres
                .map(|g| g.data.into_iter().map(|genre| genre.name).collect())
                .unwrap_or_default(),
            Err(e) => {
                debug!("Failed to parse Deezer album: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for DeezerClient {
    fn name(&self) -> &str {
        "deezer"
    }

    fn base_confidence(&self) -> f32 {
        self.base_confidence
    }

    async fn lookup(&self, artist: &str, title: &str) -> ProviderOutcome {
        let mut track = None;
        for query in Self::query_permutations(artist, title) {
            debug!(query = %query, "Deezer track search");
            match self.search(&query).await {
                Ok(tracks) => {
                    if let Some(first) = tracks.into_iter().next() {
                        track = Some(first);
                        break;
                    }
                }
                Err(outcome) => return outcome,
            }
        }

        let Some(track) = track else {
            return ProviderOutcome::NoData;
        };

        let genres = match track.album.as_ref().map(|a| a.id) {
            Some(album_id) => self.album_genres(album_id).await,
            None => Vec::new(),
        };

        let mut meta = TrackMetadata::from(track);
        meta.genres = genres;

        if meta.is_useful() {
            ProviderOutcome::Success(meta)
        } else {
            ProviderOutcome::NoData
        }
    }
}

// ============================================================================
// Deezer API response types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct DeezerSearchResponse {
    #[serde(default)]
    data: Vec<DeezerTrack>,
    #[serde(default)]
    error: Option<DeezerError>,
}

#[derive(Debug, Deserialize)]
struct DeezerError {
    #[serde(default)]
    code: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DeezerTrack {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    track_position: Option<u32>,
    #[serde(default)]
    artist: Option<DeezerArtist>,
    #[serde(default)]
    album: Option<DeezerTrackAlbum>,
}

#[derive(Debug, Deserialize)]
struct DeezerArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeezerTrackAlbum {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    cover_xl: Option<String>,
    #[serde(default)]
    cover_big: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeezerAlbum {
    #[serde(default)]
    genres: Option<DeezerGenreList>,
}

#[derive(Debug, Deserialize)]
struct DeezerGenreList {
    #[serde(default)]
    data: Vec<DeezerGenre>,
}

#[derive(Debug, Deserialize)]
struct DeezerGenre {
    name: String,
}

impl From<DeezerTrack> for TrackMetadata {
    fn from(track: DeezerTrack) -> Self {
        let album_art_url = track
            .album
            .as_ref()
            .and_then(|a| a.cover_xl.clone().or_else(|| a.cover_big.clone()));

        TrackMetadata {
            artist: track.artist.map(|a| a.name),
            title: track.title,
            album: track.album.as_ref().and_then(|a| a.title.clone()),
            release_date: track.album.as_ref().and_then(|a| a.release_date.clone()),
            track_number: track.track_position,
            genres: Vec::new(),
            album_art_url,
            duration_ms: track.duration.map(|secs| secs * 1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_permutations_order() {
        let queries = DeezerClient::query_permutations("Pink Floyd", "Money");
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "Pink Floyd Money");
        assert_eq!(queries[1], "Pink Floyd - Money");
        assert_eq!(queries[2], "Money Pink Floyd");
    }

    #[test]
    fn test_track_conversion() {
        let json = r#"{
            "title": "Money",
            "duration": 382,
            "track_position": 6,
            "artist": {"name": "Pink Floyd"},
            "album": {
                "id": 12345,
                "title": "The Dark Side of the Moon",
                "cover_xl": "https://example.com/xl.jpg",
                "cover_big": "https://example.com/big.jpg",
                "release_date": "1973-03-01"
            }
        }"#;

        let track: DeezerTrack = serde_json::from_str(json).unwrap();
        let meta = TrackMetadata::from(track);

        assert_eq!(meta.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(meta.album.as_deref(), Some("The Dark Side of the Moon"));
        assert_eq!(meta.album_art_url.as_deref(), Some("https://example.com/xl.jpg"));
        assert_eq!(meta.duration_ms, Some(382000));
        assert_eq!(meta.track_number, Some(6));
    }

    #[test]
    fn test_cover_big_fallback() {
        let json = r#"{
            "title": "Money",
            "artist": {"name": "Pink Floyd"},
            "album": {"id": 1, "cover_big": "https://example.com/big.jpg"}
        }"#;

        let track: DeezerTrack = serde_json::from_str(json).unwrap();
        let meta = TrackMetadata::from(track);
        assert_eq!(meta.album_art_url.as_deref(), Some("https://example.com/big.jpg"));
    }

    #[test]
    fn test_quota_error_in_200_body() {
        let json = r#"{"error": {"code": 4, "message": "Quota limit exceeded"}}"#;
        let body: DeezerSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.error.unwrap().code, Some(4));
    }

    #[test]
    fn test_album_genre_parsing() {
        let json = r#"{"genres": {"data": [{"name": "Rock"}, {"name": "Progressive Rock"}]}}"#;
        let album: DeezerAlbum = serde_json::from_str(json).unwrap();
        let names: Vec<String> = album
            .genres
            .unwrap()
            .data
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["Rock", "Progressive Rock"]);
    }
}
