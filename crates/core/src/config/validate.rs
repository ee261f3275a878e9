use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Retry ceilings are bounded
/// - Breaker thresholds are in (0, 1] with a non-empty window
/// - Timeouts and buffers are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Downloader validation
    if config.downloader.max_rate_limit_retries > 10 {
        return Err(ConfigError::ValidationError(
            "downloader.max_rate_limit_retries cannot exceed 10".to_string(),
        ));
    }
    if config.downloader.video_retries > 10 {
        return Err(ConfigError::ValidationError(
            "downloader.video_retries cannot exceed 10".to_string(),
        ));
    }

    // Process validation
    if config.process.job_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "process.job_timeout_secs cannot be 0".to_string(),
        ));
    }

    // Breaker validation
    let breaker = &config.enrichment.breaker;
    if breaker.window_size == 0 {
        return Err(ConfigError::ValidationError(
            "enrichment.breaker.window_size cannot be 0".to_string(),
        ));
    }
    if !(breaker.failure_threshold > 0.0 && breaker.failure_threshold <= 1.0) {
        return Err(ConfigError::ValidationError(
            "enrichment.breaker.failure_threshold must be in (0, 1]".to_string(),
        ));
    }
    if breaker.success_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "enrichment.breaker.success_threshold cannot be 0".to_string(),
        ));
    }

    // Retry validation
    let retry = &config.enrichment.retry;
    if retry.max_attempts == 0 || retry.max_attempts > 10 {
        return Err(ConfigError::ValidationError(
            "enrichment.retry.max_attempts must be in 1..=10".to_string(),
        ));
    }

    // Provider validation
    for (name, timeout) in [
        ("musicbrainz", config.enrichment.musicbrainz.timeout_secs),
        ("deezer", config.enrichment.deezer.timeout_secs),
        ("itunes", config.enrichment.itunes.timeout_secs),
    ] {
        if timeout == 0 {
            return Err(ConfigError::ValidationError(format!(
                "enrichment.{name}.timeout_secs cannot be 0"
            )));
        }
    }

    // Progress validation
    if config.progress.buffer == 0 {
        return Err(ConfigError::ValidationError(
            "progress.buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
