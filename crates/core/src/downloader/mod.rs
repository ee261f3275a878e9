//! Acquisition orchestration.
//!
//! One job at a time: pick the extractor for the query shape, stream
//! its output through the parser, and let the retry/fallback policy
//! decide what happens after each run. Partial results always reach
//! the caller.

mod command;
mod orchestrator;
mod policy;
mod single_flight;
mod types;

pub use command::{build_command, DownloaderConfig};
pub use orchestrator::Downloader;
pub use policy::{AttemptSummary, Decision, RetryPolicy};
pub use single_flight::{SingleFlight, SingleFlightGuard};
pub use types::{
    AcquireError, AcquisitionRequest, AcquisitionResult, RequestKind, ToolSource,
};
