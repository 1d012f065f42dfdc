//! Reference store: the persistence seam.
//!
//! The pipeline only needs two operations: look an identifier up and create
//! a record. An identifier conflict is resolved by reusing the stored
//! identity, never treated as an error.

use std::collections::HashMap;

use async_trait::async_trait;
use refgraph_sources::WorkMetadata;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Stored identity for a normalized DOI, if any.
    async fn find_by_doi(&self, doi: &str) -> anyhow::Result<Option<Uuid>>;

    /// Create a new stored record, returning its identity.
    async fn insert(&self, work: &WorkMetadata) -> anyhow::Result<Uuid>;
}

/// In-process store backed by a map. Serves as the default collaborator in
/// embedded use and as the test double.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    by_doi: HashMap<String, Uuid>,
    records: Vec<(Uuid, WorkMetadata)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn find_by_doi(&self, doi: &str) -> anyhow::Result<Option<Uuid>> {
        let key = refgraph_common::matching::normalize_doi(doi);
        let inner = self.inner.read().await;
        Ok(key.and_then(|k| inner.by_doi.get(&k).copied()))
    }

    async fn insert(&self, work: &WorkMetadata) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let mut inner = self.inner.write().await;
        if let Some(key) = work.normalized_doi() {
            inner.by_doi.insert(key, id);
        }
        inner.records.push((id, work.clone()));
        Ok(id)
    }
}
