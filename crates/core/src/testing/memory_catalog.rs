//! In-memory catalog for testing.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::{CatalogError, CatalogReader, CatalogRecord};

/// In-memory implementation of the CatalogReader trait.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: Mutex<Vec<CatalogRecord>>,
}

impl MemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn push(&self, record: CatalogRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn all_candidates(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn find_by_path(&self, path: &Path) -> Result<Option<CatalogRecord>, CatalogError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.path == path)
            .cloned())
    }
}
