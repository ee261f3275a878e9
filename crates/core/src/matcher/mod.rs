//! Fuzzy reconciliation matcher.
//!
//! Reconnects (artist, title) pairs reported by extractor tools with
//! existing catalog records. Both sides are normalized aggressively
//! before scoring because tool output and catalog tags rarely agree on
//! punctuation, casing or version annotations.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use crate::catalog::CatalogRecord;

/// Minimum artist similarity for a candidate to be considered at all.
const ARTIST_FLOOR: f32 = 0.7;
/// Minimum title similarity for a candidate to be considered at all.
const TITLE_FLOOR: f32 = 0.6;
/// Weight of artist similarity in the combined score.
const ARTIST_WEIGHT: f32 = 0.6;
/// Weight of title similarity in the combined score.
const TITLE_WEIGHT: f32 = 0.4;
/// Score floor applied when one normalized string contains the other.
const CONTAINMENT_BOOST: f32 = 0.8;

/// A catalog record with its computed similarity scores.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub record: CatalogRecord,
    pub artist_similarity: f32,
    pub title_similarity: f32,
}

impl MatchCandidate {
    pub fn combined_score(&self) -> f32 {
        ARTIST_WEIGHT * self.artist_similarity + TITLE_WEIGHT * self.title_similarity
    }
}

static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[][^)\]]*[)\]]").unwrap());
static VERSION_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(remaster(?:ed)?|live|acoustic|demo|extended|edit)\b").unwrap()
});
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a string for comparison.
///
/// Lowercase, strip bracketed annotations and known version suffixes,
/// drop punctuation, collapse whitespace.
pub fn normalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let stripped = BRACKETED_RE.replace_all(&lower, " ");
    let stripped = VERSION_SUFFIX_RE.replace_all(&stripped, " ");
    let stripped = NON_ALNUM_RE.replace_all(&stripped, " ");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Similarity between two normalized strings in [0, 1].
///
/// Positional character-match ratio over the longer string's length,
/// boosted to at least [`CONTAINMENT_BOOST`] when either string contains
/// the other as a substring.
pub fn similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let longer = a_chars.len().max(b_chars.len());

    let matches = a_chars
        .iter()
        .zip(b_chars.iter())
        .filter(|(x, y)| x == y)
        .count();
    let mut score = matches as f32 / longer as f32;

    if a.contains(b) || b.contains(a) {
        score = score.max(CONTAINMENT_BOOST);
    }

    score
}

/// Find the catalog record best matching an (artist, title) pair.
///
/// Returns `None` rather than a low-confidence guess. Ties on combined
/// score are broken deterministically by lowest catalog id, so the
/// result does not depend on candidate iteration order.
pub fn find_best_match(
    artist: &str,
    title: &str,
    candidates: &[CatalogRecord],
) -> Option<MatchCandidate> {
    let query_artist = normalize(artist);
    let query_title = normalize(title);

    let mut best: Option<MatchCandidate> = None;

    for record in candidates {
        let artist_similarity = similarity(&query_artist, &normalize(&record.artist));
        let title_similarity = similarity(&query_title, &normalize(&record.title));

        if artist_similarity < ARTIST_FLOOR || title_similarity < TITLE_FLOOR {
            continue;
        }

        let candidate = MatchCandidate {
            record: record.clone(),
            artist_similarity,
            title_similarity,
        };

        let replace = match &best {
            None => true,
            Some(current) => {
                let diff = candidate.combined_score() - current.combined_score();
                diff > f32::EPSILON
                    || (diff.abs() <= f32::EPSILON && candidate.record.id < current.record.id)
            }
        };
        if replace {
            best = Some(candidate);
        }
    }

    if let Some(ref m) = best {
        debug!(
            artist = artist,
            title = title,
            matched_id = m.record.id,
            score = m.combined_score(),
            "Fuzzy match found"
        );
    }

    best
}
