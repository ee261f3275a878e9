pub mod breaker;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod enrichment;
pub mod matcher;
pub mod metrics;
pub mod output;
pub mod process;
pub mod progress;
pub mod providers;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use downloader::{
    AcquireError, AcquisitionRequest, AcquisitionResult, Downloader, SingleFlight, ToolSource,
};
pub use enrichment::{EnrichedMetadata, Enricher};
pub use matcher::{find_best_match, MatchCandidate};
pub use process::{ProcessConfig, ProcessRunner, TokioProcessRunner};
pub use progress::{ProgressHandle, ProgressLine};
