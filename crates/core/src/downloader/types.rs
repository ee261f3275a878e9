use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::process::ProcessError;

/// What kind of source the query string points at. Decides which tool
/// runs first and which flags it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Free-text search terms.
    SearchQuery,
    /// A Spotify track/album/playlist URL.
    SpotifyUrl,
    /// A direct video URL (YouTube and friends).
    VideoUrl,
}

impl RequestKind {
    pub fn classify(query: &str) -> Self {
        let q = query.trim();
        if q.contains("open.spotify.com") || q.starts_with("spotify:") {
            RequestKind::SpotifyUrl
        } else if q.starts_with("http://") || q.starts_with("https://") {
            RequestKind::VideoUrl
        } else {
            RequestKind::SearchQuery
        }
    }
}

/// Which extractor produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    SpotDl,
    YtDlp,
    /// spotdl invoked as a search fallback after yt-dlp gave up.
    SpotDlFallback,
}

impl ToolSource {
    pub fn program(&self) -> &'static str {
        match self {
            ToolSource::SpotDl | ToolSource::SpotDlFallback => "spotdl",
            ToolSource::YtDlp => "yt-dlp",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolSource::SpotDl => "spotdl",
            ToolSource::YtDlp => "yt-dlp",
            ToolSource::SpotDlFallback => "spotdl_fallback",
        }
    }
}

/// One acquisition job. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    /// Search terms or a URL.
    pub query: String,
    /// Output audio format, e.g. "mp3".
    pub format: String,
    pub download_threads: u32,
    pub search_threads: u32,
    pub output_dir: PathBuf,
    /// Routes progress lines back to the caller.
    pub correlation_id: Uuid,
}

impl AcquisitionRequest {
    pub fn new(query: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            format: "mp3".to_string(),
            download_threads: 4,
            search_threads: 4,
            output_dir: output_dir.into(),
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> RequestKind {
        RequestKind::classify(&self.query)
    }
}

/// What one acquisition job produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionResult {
    /// Files verified to exist on disk after the run.
    pub downloaded_files: Vec<PathBuf>,
    /// (artist, title) pairs the tool reported as already present.
    pub skipped: Vec<(String, String)>,
    /// Files the tool claimed to produce but were not found on disk.
    pub skipped_or_missing: Vec<String>,
    /// Queries the job could not finish processing.
    pub unprocessed: Vec<String>,
    /// Full captured tool output across all attempts.
    pub output_log: String,
    pub source: ToolSource,
}

/// Errors an acquisition job can surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("an acquisition job is already in progress")]
    AlreadyInProgress,

    #[error("required tool '{tool}' is not installed")]
    ToolMissing { tool: String },

    #[error("failed to spawn '{tool}': {reason}")]
    Spawn { tool: String, reason: String },

    #[error("acquisition job was interrupted")]
    Interrupted,

    #[error("acquisition job exceeded the {timeout_secs}s wall clock ceiling")]
    Timeout { timeout_secs: u64 },

    #[error("the tool ran but no songs were processed")]
    NoSongsProcessed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for AcquireError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::SpawnError { program, reason } => AcquireError::Spawn {
                tool: program,
                reason,
            },
            ProcessError::Interrupted { .. } => AcquireError::Interrupted,
            ProcessError::Timeout { timeout_secs, .. } => AcquireError::Timeout { timeout_secs },
            ProcessError::Io(e) => AcquireError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_spotify_url() {
        assert_eq!(
            RequestKind::classify("https://open.spotify.com/track/abc123"),
            RequestKind::SpotifyUrl
        );
        assert_eq!(
            RequestKind::classify("spotify:track:abc123"),
            RequestKind::SpotifyUrl
        );
    }

    #[test]
    fn test_classify_video_url() {
        assert_eq!(
            RequestKind::classify("https://www.youtube.com/watch?v=abc"),
            RequestKind::VideoUrl
        );
        assert_eq!(
            RequestKind::classify("https://youtu.be/abc"),
            RequestKind::VideoUrl
        );
    }

    #[test]
    fn test_classify_search_query() {
        assert_eq!(
            RequestKind::classify("pink floyd money"),
            RequestKind::SearchQuery
        );
    }

    #[test]
    fn test_tool_source_program() {
        assert_eq!(ToolSource::SpotDl.program(), "spotdl");
        assert_eq!(ToolSource::SpotDlFallback.program(), "spotdl");
        assert_eq!(ToolSource::YtDlp.program(), "yt-dlp");
    }
}
