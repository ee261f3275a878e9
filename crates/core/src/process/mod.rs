//! External process execution with streaming output.
//!
//! Extractor tools run for minutes; callers need live output. The runner
//! merges stdout and stderr into one line stream, broadcasts every line
//! to the progress sink, and hands the same lines to the caller through
//! a channel as they arrive. Nothing is buffered until process exit
//! except the full capture kept for post-run classification.

mod error;
mod runner;
mod traits;
mod types;

pub use error::ProcessError;
pub use runner::TokioProcessRunner;
pub use traits::ProcessRunner;
pub use types::{ProcessConfig, ProcessOutput, ToolCommand};
