//! Trait definitions for the catalog boundary.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use super::types::CatalogRecord;

/// Errors surfaced by catalog implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog backend error: {0}")]
    Backend(String),
}

/// Read-only access to the local catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// All records eligible as reconciliation candidates.
    async fn all_candidates(&self) -> Result<Vec<CatalogRecord>, CatalogError>;

    /// Exact path lookup.
    async fn find_by_path(&self, path: &Path) -> Result<Option<CatalogRecord>, CatalogError>;
}
