//! Catalog client: the external metadata provider queried per issue.
//!
//! The core consumes the catalog through the narrow [`CatalogClient`] trait;
//! [`ComicVineClient`] is the production implementation. Tests substitute a
//! scripted client.

mod comicvine;
mod types;

use async_trait::async_trait;

use crate::Result;

pub use comicvine::ComicVineClient;
pub use types::{CatalogMatch, CreditEntry};

/// Search interface the resolver depends on.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Query the catalog for candidate records matching a series title and
    /// issue number. Zero, one, or many candidates; order is meaningful (the
    /// resolver's final tie-break is catalog order).
    async fn search(&self, series_title: &str, issue_number: &str) -> Result<Vec<CatalogMatch>>;

    /// Fetch the full record for a match returned by [`search`](Self::search).
    /// Search responses carry a trimmed record without credits, publisher, or
    /// page count; catalogs with a per-record endpoint return the complete
    /// version here. The default covers clients that have nothing to add.
    async fn fetch_detail(&self, _record_id: i64) -> Result<Option<CatalogMatch>> {
        Ok(None)
    }
}
