//! Bibliographic source clients.

pub mod crossref;
pub mod openalex;
pub mod semanticscholar;

use async_trait::async_trait;

use crate::models::WorkMetadata;

/// Common interface for all bibliographic source clients.
///
/// Implementations are read-only after construction and safe to share
/// across concurrent pipeline runs. Not every service covers the full
/// surface: an operation a service cannot serve returns an empty result,
/// never an error.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Free-text search for works matching a query.
    async fn search_works(&self, query: &str, limit: usize) -> anyhow::Result<Vec<WorkMetadata>>;

    /// Look up a single work by its source-native id or DOI.
    async fn get_work_by_id(&self, id: &str) -> anyhow::Result<Option<WorkMetadata>>;

    /// Works cited BY this work (backward chain).
    async fn get_referenced_works(
        &self,
        id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>>;

    /// Works that CITE this work (forward chain), optionally ordered by
    /// descending citation count.
    async fn get_citing_works(
        &self,
        id: &str,
        limit: usize,
        sort_by_citations: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>>;

    /// Resolve an author display name to a source-native author id.
    async fn search_author(&self, name: &str) -> anyhow::Result<Option<String>>;

    /// Other works by a resolved author.
    async fn get_author_works(
        &self,
        author_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>>;

    /// Keyword search scoped to a named venue.
    async fn search_in_venue(
        &self,
        query: &str,
        venue: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>>;
}
