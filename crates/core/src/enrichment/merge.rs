use serde::{Deserialize, Serialize};

use crate::providers::{is_placeholder, TrackMetadata};

/// Bonus added to the confidence score for each corroborating signal
/// (duration, release date, album) present after a merge.
const SIGNAL_BONUS: f32 = 0.1;

/// The merged result of one enrichment run. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    pub duration_ms: Option<u64>,
    /// Union of provider genres, deduplicated, first-seen order.
    pub genres: Vec<String>,
    pub album_art_url: Option<String>,
    /// Names of the providers that contributed at least one field.
    pub providers: Vec<String>,
    /// Overall confidence in [0, 1].
    pub confidence: f32,
    /// Per-provider outcome labels, in call order.
    pub outcomes: Vec<(String, String)>,
}

impl EnrichedMetadata {
    /// True when enrichment replaced a placeholder artist with a real one.
    pub fn improved_artist(&self, original_artist: &str) -> bool {
        is_placeholder(original_artist)
            && self
                .artist
                .as_deref()
                .map(|a| !is_placeholder(a))
                .unwrap_or(false)
    }
}

/// Accumulates provider results into an [`EnrichedMetadata`].
#[derive(Debug, Default)]
pub(super) struct MergeState {
    artist: Option<String>,
    title: Option<String>,
    album: Option<String>,
    release_date: Option<String>,
    track_number: Option<u32>,
    duration_ms: Option<u64>,
    genres: Vec<String>,
    album_art_url: Option<String>,
    providers: Vec<String>,
    confidence: f32,
    outcomes: Vec<(String, String)>,
}

impl MergeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, provider: &str, label: &str) {
        self.outcomes.push((provider.to_string(), label.to_string()));
    }

    pub fn has_art(&self) -> bool {
        self.album_art_url.is_some()
    }

    pub fn has_any_provider(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Merge one provider's metadata. Earlier providers win every field
    /// except genres, which are unioned preserving first-seen order.
    pub fn apply(&mut self, provider: &str, base_confidence: f32, meta: TrackMetadata) {
        let mut contributed = false;

        if self.artist.is_none() {
            if let Some(artist) = meta.artist.filter(|a| !is_placeholder(a)) {
                self.artist = Some(artist);
                contributed = true;
            }
        }
        if self.title.is_none() {
            if let Some(title) = meta.title.filter(|t| !t.trim().is_empty()) {
                self.title = Some(title);
                contributed = true;
            }
        }
        if self.album.is_none() {
            if let Some(album) = meta.album.filter(|a| !a.trim().is_empty()) {
                self.album = Some(album);
                contributed = true;
            }
        }
        if self.release_date.is_none() {
            if let Some(date) = meta.release_date.filter(|d| !d.trim().is_empty()) {
                self.release_date = Some(date);
                contributed = true;
            }
        }
        if self.track_number.is_none() {
            if let Some(n) = meta.track_number {
                self.track_number = Some(n);
                contributed = true;
            }
        }
        if self.duration_ms.is_none() {
            if let Some(ms) = meta.duration_ms {
                self.duration_ms = Some(ms);
                contributed = true;
            }
        }
        if self.album_art_url.is_none() {
            if let Some(url) = meta.album_art_url.filter(|u| !u.trim().is_empty()) {
                self.album_art_url = Some(url);
                contributed = true;
            }
        }
        for genre in meta.genres {
            let known = self
                .genres
                .iter()
                .any(|g| g.eq_ignore_ascii_case(&genre));
            if !known {
                self.genres.push(genre);
                contributed = true;
            }
        }

        if contributed {
            self.providers.push(provider.to_string());
            // Confidence only ever goes up.
            self.confidence = self.confidence.max(base_confidence);
        }
    }

    pub fn finish(mut self) -> EnrichedMetadata {
        if self.has_any_provider() {
            let signals = [
                self.duration_ms.is_some(),
                self.release_date.is_some(),
                self.album.is_some(),
            ]
            .iter()
            .filter(|present| **present)
            .count();
            self.confidence = (self.confidence + signals as f32 * SIGNAL_BONUS).min(1.0);
        }

        EnrichedMetadata {
            artist: self.artist,
            title: self.title,
            album: self.album,
            release_date: self.release_date,
            track_number: self.track_number,
            duration_ms: self.duration_ms,
            genres: self.genres,
            album_art_url: self.album_art_url,
            providers: self.providers,
            confidence: self.confidence,
            outcomes: self.outcomes,
        }
    }
}
