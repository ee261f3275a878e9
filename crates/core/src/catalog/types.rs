//! Catalog record types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A track already present in the local catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: Option<String>,
    pub path: PathBuf,
}

impl CatalogRecord {
    pub fn new(id: i64, artist: impl Into<String>, title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            artist: artist.into(),
            title: title.into(),
            album: None,
            path: path.into(),
        }
    }
}
