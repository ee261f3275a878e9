//! Provider outcome and payload types.

use std::time::Duration;

/// Metadata returned by one provider for one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    /// Release date as reported by the provider (ISO-ish, not parsed).
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    pub genres: Vec<String>,
    pub album_art_url: Option<String>,
    pub duration_ms: Option<u64>,
}

impl TrackMetadata {
    /// Whether the payload carries anything worth merging.
    ///
    /// Placeholder-only records are treated as empty even when the HTTP
    /// call succeeded.
    pub fn is_useful(&self) -> bool {
        let real = |v: &Option<String>| v.as_deref().is_some_and(|s| !is_placeholder(s));
        real(&self.artist)
            || real(&self.title)
            || real(&self.album)
            || self.release_date.is_some()
            || self.duration_ms.is_some()
    }
}

/// Whether a field value is a placeholder rather than real data.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v.is_empty()
        || v == "unknown"
        || v == "unknown artist"
        || v == "unknown title"
        || v == "unknown album"
        || v == "various artists"
        || v == "n/a"
}

/// Classified result of one provider call.
///
/// Flat tagged variant so callers branch on data, not on error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Success(TrackMetadata),
    /// HTTP success but nothing useful for this (artist, title).
    NoData,
    /// HTTP 429; `retry_after` from the Retry-After header when present.
    RateLimited { retry_after: Option<Duration> },
    /// Server error or transport failure short of a timeout.
    Unavailable { status: Option<u16> },
    /// The request exceeded the provider timeout.
    Timeout { elapsed: Duration },
    /// Response body could not be decoded.
    ParseError,
}

impl ProviderOutcome {
    /// Failures count against the circuit breaker; NoData does not,
    /// because "we don't know this track" is a healthy answer.
    pub fn is_breaker_failure(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::ParseError
        )
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NoData => "no_data",
            Self::RateLimited { .. } => "rate_limited",
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::ParseError => "parse_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  "));
        assert!(is_placeholder("Unknown"));
        assert!(is_placeholder("unknown artist"));
        assert!(is_placeholder("N/A"));
        assert!(!is_placeholder("Pink Floyd"));
    }

    #[test]
    fn test_metadata_usefulness() {
        assert!(!TrackMetadata::default().is_useful());

        let placeholder_only = TrackMetadata {
            artist: Some("Unknown Artist".to_string()),
            title: Some("unknown".to_string()),
            ..Default::default()
        };
        assert!(!placeholder_only.is_useful());

        let with_duration = TrackMetadata {
            duration_ms: Some(382_000),
            ..Default::default()
        };
        assert!(with_duration.is_useful());

        let with_artist = TrackMetadata {
            artist: Some("Pink Floyd".to_string()),
            ..Default::default()
        };
        assert!(with_artist.is_useful());
    }

    #[test]
    fn test_breaker_failure_classification() {
        assert!(ProviderOutcome::Unavailable { status: Some(503) }.is_breaker_failure());
        assert!(ProviderOutcome::Timeout {
            elapsed: Duration::from_secs(10)
        }
        .is_breaker_failure());
        assert!(ProviderOutcome::ParseError.is_breaker_failure());

        assert!(!ProviderOutcome::NoData.is_breaker_failure());
        assert!(!ProviderOutcome::Success(TrackMetadata::default()).is_breaker_failure());
        assert!(!ProviderOutcome::RateLimited { retry_after: None }.is_breaker_failure());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ProviderOutcome::NoData.label(), "no_data");
        assert_eq!(
            ProviderOutcome::RateLimited { retry_after: None }.label(),
            "rate_limited"
        );
    }
}
