//! Metadata provider clients.
//!
//! Each provider performs a single query against one external metadata
//! source and classifies the outcome into [`ProviderOutcome`]. Outcomes
//! are always returned as data, never raised, so the enrichment
//! orchestrator can continue with the remaining providers.

mod deezer;
mod itunes;
mod musicbrainz;
mod traits;
mod types;

pub use deezer::{DeezerClient, DeezerConfig};
pub use itunes::{ItunesClient, ItunesConfig};
pub use musicbrainz::{MusicBrainzClient, MusicBrainzConfig};
pub use traits::MetadataProvider;
pub use types::{is_placeholder, ProviderOutcome, TrackMetadata};

/// Identifying User-Agent sent with every provider request.
pub(crate) fn client_user_agent() -> String {
    format!(
        "Tunedeck/{} ( https://github.com/tunedeck )",
        env!("CARGO_PKG_VERSION")
    )
}
