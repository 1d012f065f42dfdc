//! Crossref API client.
//!
//! Used as the primary verification source: `query.bibliographic` accepts a
//! combined author+title string and ranks by relevance. Crossref serves no
//! citation-graph surface here, so the graph operations return empty.
//!
//! API: https://api.crossref.org/works
//! Polite pool: pass the `mailto` param (see Crossref etiquette).

use async_trait::async_trait;
use refgraph_common::RefgraphError;
use tracing::{debug, instrument};

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::BibliographicSource;

const CR_API_BASE: &str = "https://api.crossref.org/works";

pub struct CrossrefSource {
    client: SourceClient,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(mailto: Option<String>) -> Self {
        Self::with_concurrency(mailto, 5)
    }

    pub fn with_concurrency(mailto: Option<String>, max_concurrent: usize) -> Self {
        Self {
            client: SourceClient::new("crossref", max_concurrent),
            mailto,
        }
    }
}

impl Default for CrossrefSource {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl BibliographicSource for CrossrefSource {
    fn name(&self) -> &'static str {
        "crossref"
    }

    #[instrument(skip(self))]
    async fn search_works(&self, query: &str, limit: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        let mut params = vec![
            ("query.bibliographic", query.to_string()),
            ("rows", limit.to_string()),
            (
                "select",
                "DOI,title,author,container-title,issued,is-referenced-by-count".to_string(),
            ),
        ];
        if let Some(email) = &self.mailto {
            params.push(("mailto", email.clone()));
        }

        let resp = self.client.get_json(CR_API_BASE, &params).await?;
        let items = resp["message"]["items"].as_array().cloned().unwrap_or_default();
        debug!(n = items.len(), "Crossref search results");
        Ok(items.iter().map(item_to_metadata).collect())
    }

    async fn get_work_by_id(&self, id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        let url = format!("{CR_API_BASE}/{id}");
        match self.client.get_json(&url, &[]).await {
            Ok(resp) => Ok(Some(item_to_metadata(&resp["message"]))),
            Err(RefgraphError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_referenced_works(
        &self,
        _id: &str,
        _limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }

    async fn get_citing_works(
        &self,
        _id: &str,
        _limit: usize,
        _sort_by_citations: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }

    async fn search_author(&self, _name: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn get_author_works(
        &self,
        _author_id: &str,
        _limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }

    async fn search_in_venue(
        &self,
        _query: &str,
        _venue: &str,
        _limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn item_to_metadata(item: &serde_json::Value) -> WorkMetadata {
    let title = item["title"]
        .as_array()
        .and_then(|t| t.first())
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string();

    let authors: Vec<String> = item["author"]
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|a| {
            let given = a["given"].as_str().unwrap_or("").trim();
            let family = a["family"].as_str().unwrap_or("").trim();
            match (given.is_empty(), family.is_empty()) {
                (false, false) => Some(format!("{given} {family}")),
                (true, false) => Some(family.to_string()),
                _ => None,
            }
        })
        .collect();

    let venue = item["container-title"]
        .as_array()
        .and_then(|j| j.first())
        .and_then(|j| j.as_str())
        .map(String::from);

    let year = item["issued"]["date-parts"]
        .as_array()
        .and_then(|dp| dp.first())
        .and_then(|dp| dp.as_array())
        .and_then(|parts| parts.first())
        .and_then(|y| y.as_i64())
        .unwrap_or(0) as i32;

    WorkMetadata {
        title,
        authors,
        year,
        venue,
        doi: item["DOI"].as_str().map(String::from),
        source_id: None,
        preprint_id: None,
        pmid: None,
        cited_by_count: item["is-referenced-by-count"].as_u64().unwrap_or(0) as u32,
        full_text_url: None,
    }
}
