//! Metadata enrichment orchestrator.
//!
//! Runs the provider chain for one (artist, title) pair and merges the
//! results into a single [`EnrichedMetadata`]. Providers are called in a
//! fixed priority order and the first provider to supply a field wins it,
//! except genres, which are unioned across providers in first-seen order.

mod merge;
mod orchestrator;

pub use merge::EnrichedMetadata;
pub use orchestrator::{Enricher, EnricherConfig};
