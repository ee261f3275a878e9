//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external boundaries
//! (extractor processes, metadata providers, the catalog), allowing
//! lifecycle tests without real tools or network access.

mod memory_catalog;
mod mock_process_runner;
mod mock_provider;

pub use memory_catalog::MemoryCatalog;
pub use mock_process_runner::MockProcessRunner;
pub use mock_provider::MockProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::CatalogRecord;

    /// Create a catalog record with reasonable defaults.
    pub fn catalog_record(id: i64, artist: &str, title: &str) -> CatalogRecord {
        CatalogRecord {
            id,
            artist: artist.to_string(),
            title: title.to_string(),
            album: None,
            path: format!("/music/{artist} - {title}.mp3").into(),
        }
    }
}
