use serde::{Deserialize, Serialize};

use crate::downloader::DownloaderConfig;
use crate::enrichment::EnricherConfig;
use crate::process::ProcessConfig;

/// Top-level configuration. Every section has full serde defaults, so
/// an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub enrichment: EnricherConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Progress broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Channel capacity. Lines past a full buffer are dropped.
    #[serde(default = "default_progress_buffer")]
    pub buffer: usize,
}

fn default_progress_buffer() -> usize {
    1024
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            buffer: default_progress_buffer(),
        }
    }
}

/// Configuration safe to log at startup. The cookie file path is the
/// only value treated as sensitive today.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub downloader: SanitizedDownloaderConfig,
    pub process: ProcessConfig,
    pub enrichment: EnricherConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub rate_limit_wait_secs: u64,
    pub max_rate_limit_retries: u32,
    pub video_retries: u32,
    pub video_retry_wait_secs: u64,
    pub video_rate_limit_wait_secs: u64,
    pub cookie_file: &'static str,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            downloader: SanitizedDownloaderConfig {
                rate_limit_wait_secs: config.downloader.rate_limit_wait_secs,
                max_rate_limit_retries: config.downloader.max_rate_limit_retries,
                video_retries: config.downloader.video_retries,
                video_retry_wait_secs: config.downloader.video_retry_wait_secs,
                video_rate_limit_wait_secs: config.downloader.video_rate_limit_wait_secs,
                cookie_file: if config.downloader.cookie_file.is_some() {
                    "<set>"
                } else {
                    "<unset>"
                },
            },
            process: config.process.clone(),
            enrichment: config.enrichment.clone(),
            progress: config.progress.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.process.job_timeout_secs, 3600);
        assert_eq!(config.progress.buffer, 1024);
        assert_eq!(config.downloader.rate_limit_wait_secs, 60);
    }

    #[test]
    fn test_sanitized_config_redacts_cookie_file() {
        let mut config = Config::default();
        config.downloader.cookie_file = Some(PathBuf::from("/home/user/cookies.txt"));

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.downloader.cookie_file, "<set>");

        let rendered = serde_json::to_string(&sanitized).unwrap();
        assert!(!rendered.contains("cookies.txt"));
    }
}
