//! Read-only catalog collaborator boundary.
//!
//! The persistent catalog lives outside this crate; the engine only
//! needs candidate listing for fuzzy reconciliation and exact path
//! lookup for post-run verification.

mod traits;
mod types;

pub use traits::{CatalogError, CatalogReader};
pub use types::CatalogRecord;
