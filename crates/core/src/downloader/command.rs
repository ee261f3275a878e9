use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::process::ToolCommand;

use super::types::{AcquisitionRequest, RequestKind, ToolSource};

/// Downloader tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Cooldown when a rate limit is hit and the tool reported no wait.
    #[serde(default = "default_rate_limit_wait")]
    pub rate_limit_wait_secs: u64,
    /// Ceiling on rate-limited re-invocations within a single job.
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    /// Retries for a direct video URL before falling back to search.
    #[serde(default = "default_video_retries")]
    pub video_retries: u32,
    /// Wait between direct video retries on non-rate-limit errors.
    #[serde(default = "default_video_retry_wait")]
    pub video_retry_wait_secs: u64,
    /// Wait between direct video retries when rate limited.
    #[serde(default = "default_video_rate_limit_wait")]
    pub video_rate_limit_wait_secs: u64,
    /// Cookie file passed to the extractor for age-gated sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_file: Option<PathBuf>,
}

fn default_rate_limit_wait() -> u64 {
    60
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_video_retries() -> u32 {
    3
}

fn default_video_retry_wait() -> u64 {
    5
}

fn default_video_rate_limit_wait() -> u64 {
    60
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            rate_limit_wait_secs: default_rate_limit_wait(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            video_retries: default_video_retries(),
            video_retry_wait_secs: default_video_retry_wait(),
            video_rate_limit_wait_secs: default_video_rate_limit_wait(),
            cookie_file: None,
        }
    }
}

/// Build the extractor invocation for one attempt.
///
/// `single_thread` forces all concurrency flags to 1, used after a
/// rate-limited re-invocation. `query_override` replaces the request
/// query, used when a video-URL job falls back to a spotdl search with
/// terms recovered from earlier output.
pub fn build_command(
    request: &AcquisitionRequest,
    config: &DownloaderConfig,
    source: ToolSource,
    single_thread: bool,
    query_override: Option<&str>,
) -> ToolCommand {
    let download_threads = if single_thread {
        1
    } else {
        request.download_threads.max(1)
    };
    let search_threads = if single_thread {
        1
    } else {
        request.search_threads.max(1)
    };

    let query = query_override.unwrap_or(&request.query);
    let args = match source {
        ToolSource::SpotDl | ToolSource::SpotDlFallback => {
            spotdl_args(request, config, query, download_threads, search_threads)
        }
        ToolSource::YtDlp => ytdlp_args(request, config, query, download_threads),
    };

    ToolCommand::new(source.program(), args, request.correlation_id)
        .with_working_dir(request.output_dir.clone())
}

fn spotdl_args(
    request: &AcquisitionRequest,
    config: &DownloaderConfig,
    query: &str,
    download_threads: u32,
    search_threads: u32,
) -> Vec<String> {
    let output_template = request
        .output_dir
        .join("{artists} - {title}.{output-ext}")
        .to_string_lossy()
        .into_owned();

    let mut args = vec![
        "download".to_string(),
        query.to_string(),
        "--format".to_string(),
        request.format.clone(),
        "--output".to_string(),
        output_template,
        "--download-threads".to_string(),
        download_threads.to_string(),
        "--search-threads".to_string(),
        search_threads.to_string(),
    ];
    if let Some(cookie_file) = &config.cookie_file {
        args.push("--cookie-file".to_string());
        args.push(cookie_file.to_string_lossy().into_owned());
    }
    args
}

fn ytdlp_args(
    request: &AcquisitionRequest,
    config: &DownloaderConfig,
    query: &str,
    download_threads: u32,
) -> Vec<String> {
    let output_template = request
        .output_dir
        .join("%(artist,uploader)s - %(title)s.%(ext)s")
        .to_string_lossy()
        .into_owned();

    // A plain search query routed to yt-dlp goes through ytsearch.
    let target = match request.kind() {
        RequestKind::SearchQuery => format!("ytsearch1:{}", query),
        _ => query.to_string(),
    };

    let mut args = vec![
        "--extract-audio".to_string(),
        "--audio-format".to_string(),
        request.format.clone(),
        "--output".to_string(),
        output_template,
        "--concurrent-fragments".to_string(),
        download_threads.to_string(),
        "--no-playlist".to_string(),
    ];
    if let Some(cookie_file) = &config.cookie_file {
        args.push("--cookies".to_string());
        args.push(cookie_file.to_string_lossy().into_owned());
    }
    args.push(target);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str) -> AcquisitionRequest {
        AcquisitionRequest::new(query, "/music")
    }

    #[test]
    fn test_spotdl_command_shape() {
        let cmd = build_command(
            &request("https://open.spotify.com/track/abc"),
            &DownloaderConfig::default(),
            ToolSource::SpotDl,
            false,
            None,
        );
        assert_eq!(cmd.program, "spotdl");
        assert_eq!(cmd.args[0], "download");
        assert_eq!(cmd.args[1], "https://open.spotify.com/track/abc");
        assert!(cmd.args.contains(&"--format".to_string()));
        assert!(cmd.args.contains(&"4".to_string()));
        assert_eq!(cmd.working_dir.as_deref(), Some(std::path::Path::new("/music")));
    }

    #[test]
    fn test_single_thread_forces_concurrency_to_one() {
        let cmd = build_command(
            &request("pink floyd money"),
            &DownloaderConfig::default(),
            ToolSource::SpotDl,
            true,
            None,
        );
        assert!(cmd.args.contains(&"1".to_string()));
        assert!(!cmd.args.contains(&"4".to_string()));
    }

    #[test]
    fn test_ytdlp_direct_url() {
        let cmd = build_command(
            &request("https://www.youtube.com/watch?v=abc"),
            &DownloaderConfig::default(),
            ToolSource::YtDlp,
            false,
            None,
        );
        assert_eq!(cmd.program, "yt-dlp");
        assert_eq!(
            cmd.args.last().map(String::as_str),
            Some("https://www.youtube.com/watch?v=abc")
        );
    }

    #[test]
    fn test_ytdlp_search_query_uses_ytsearch() {
        let cmd = build_command(
            &request("pink floyd money"),
            &DownloaderConfig::default(),
            ToolSource::YtDlp,
            false,
            None,
        );
        assert_eq!(
            cmd.args.last().map(String::as_str),
            Some("ytsearch1:pink floyd money")
        );
    }

    #[test]
    fn test_query_override_replaces_url_for_fallback_search() {
        let cmd = build_command(
            &request("https://www.youtube.com/watch?v=abc"),
            &DownloaderConfig::default(),
            ToolSource::SpotDlFallback,
            false,
            Some("Artist - Song"),
        );
        assert_eq!(cmd.program, "spotdl");
        assert_eq!(cmd.args[1], "Artist - Song");
    }

    #[test]
    fn test_cookie_file_flag() {
        let config = DownloaderConfig {
            cookie_file: Some(PathBuf::from("/etc/tunedeck/cookies.txt")),
            ..Default::default()
        };
        let spotdl = build_command(&request("q"), &config, ToolSource::SpotDl, false, None);
        assert!(spotdl.args.contains(&"--cookie-file".to_string()));

        let ytdlp = build_command(
            &request("https://youtu.be/abc"),
            &config,
            ToolSource::YtDlp,
            false,
            None,
        );
        assert!(ytdlp.args.contains(&"--cookies".to_string()));
    }
}
