//! Extractor tool output classification.
//!
//! The extractor tools produce heterogeneous, versioned text output. This
//! module is a stateless line classifier: it recognizes "downloaded",
//! "skipped duplicate" and "rate limited" signals and emits typed events.
//! No side effects, fully deterministic, tested against literal fixtures.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;

/// A classified output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// The tool produced an output file.
    Downloaded(String),
    /// The tool skipped a track it considers already present.
    SkippedDuplicate { artist: String, title: String },
    /// The tool reported being rate limited, with the wait it announced
    /// (if any).
    RateLimitHit(Option<Duration>),
    /// Anything else (progress percentages, log noise, ...).
    Unrecognized,
}

// `[download] Destination: /music/Artist - Title.mp3`
static DESTINATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:download|ExtractAudio)\] Destination:\s+(.+)$").unwrap());

// `[Merger] Merging formats into "/music/video.mp4"`
static MERGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\[Merger\] Merging formats into "(.+)""#).unwrap());

// `Downloaded "Pink Floyd - Money": https://music.youtube.com/watch?v=...`
// The quoted part is the track credit, not a path; the file on disk is
// `<credit>.<format>` per the output template.
static DOWNLOADED_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Downloaded "([^"]+)""#).unwrap());

// `Skipping "Artist - Title (2011 Remaster)" as it's already downloaded`
static SKIP_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"Skipping "([^"]+)" as it.s already downloaded"#).unwrap());

// `Skipping 'Title' by 'Artist' (already downloaded)`
static SKIP_BY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Skipping '([^']+)' by '([^']+)'").unwrap());

// `Retry will occur after: 45 s`
static RETRY_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Retry will occur after:\s*(\d+)").unwrap());

// Trailing parenthetical or bracketed annotation: `Money (2011 Remaster)`
static TRAILING_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[(\[][^)\]]*[)\]]\s*$").unwrap());

// Trailing dash annotation: `Money - 2011 Remaster`, `Song - Radio Edit`
static TRAILING_DASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+-\s+[^-]*(?:remaster(?:ed)?|version|edit|mix|live|mono|stereo|demo)[^-]*$")
        .unwrap()
});

// Artist separators: `A, B`, `A feat. B`, `A & B`, `A / B`
static ARTIST_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|/|&)\s*|\s+(?:feat\.?|ft\.?)\s+").unwrap());

/// Classify one output line from either extractor tool.
pub fn classify(line: &str) -> LineEvent {
    if let Some(caps) = DESTINATION_RE.captures(line) {
        return LineEvent::Downloaded(caps[1].trim().to_string());
    }
    if let Some(caps) = MERGER_RE.captures(line) {
        return LineEvent::Downloaded(caps[1].trim().to_string());
    }
    if let Some(caps) = DOWNLOADED_QUOTED_RE.captures(line) {
        return LineEvent::Downloaded(caps[1].trim().to_string());
    }

    if let Some(caps) = SKIP_QUOTED_RE.captures(line) {
        // Quoted form carries `Artist - Title` in one string.
        let (artist, title) = split_artist_title(&caps[1]);
        return LineEvent::SkippedDuplicate {
            artist: primary_artist(&artist),
            title: clean_title(&title),
        };
    }
    if let Some(caps) = SKIP_BY_RE.captures(line) {
        return LineEvent::SkippedDuplicate {
            artist: primary_artist(&caps[2]),
            title: clean_title(&caps[1]),
        };
    }

    if let Some(caps) = RETRY_AFTER_RE.captures(line) {
        let secs: u64 = caps[1].parse().unwrap_or(0);
        return LineEvent::RateLimitHit(Some(Duration::from_secs(secs)));
    }
    let lower = line.to_lowercase();
    if lower.contains("http error 429")
        || lower.contains("429: too many requests")
        || lower.contains("rate limit")
        || lower.contains("rate-limit")
    {
        return LineEvent::RateLimitHit(None);
    }

    LineEvent::Unrecognized
}

/// Split a combined `Artist - Title` string on the first ` - `.
///
/// When no separator is present the whole string is treated as the title
/// with an empty artist.
pub fn split_artist_title(combined: &str) -> (String, String) {
    match combined.split_once(" - ") {
        Some((artist, title)) => (artist.trim().to_string(), title.trim().to_string()),
        None => (String::new(), combined.trim().to_string()),
    }
}

/// Remove trailing remaster/version annotations from a title.
///
/// `Money (2011 Remaster)` and `Money - 2011 Remaster` both become `Money`.
pub fn clean_title(title: &str) -> String {
    let mut cleaned = title.trim().to_string();
    loop {
        let next = TRAILING_PAREN_RE.replace(&cleaned, "").trim().to_string();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    cleaned = TRAILING_DASH_RE.replace(&cleaned, "").trim().to_string();
    cleaned
}

/// Extract the primary artist from a multi-artist credit string.
///
/// `Artist feat. Other`, `A, B` and `A & B` all yield the first name.
pub fn primary_artist(artist: &str) -> String {
    ARTIST_SEP_RE
        .split(artist)
        .next()
        .unwrap_or(artist)
        .trim()
        .to_string()
}
