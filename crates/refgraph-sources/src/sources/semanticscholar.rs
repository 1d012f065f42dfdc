//! Semantic Scholar Graph API client.
//!
//! Third interchangeable source: paper search and lookup, citation edges in
//! both directions, and author works. The API does not sort citations
//! server-side, so descending-citation order is applied after the fetch.
//!
//! API: https://api.semanticscholar.org/graph/v1 (optional `x-api-key` header).

use async_trait::async_trait;
use refgraph_common::RefgraphError;
use tracing::{debug, instrument};

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::BibliographicSource;

const S2_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const PAPER_FIELDS: &str = "paperId,title,authors,year,venue,externalIds,citationCount,openAccessPdf";

pub struct SemanticScholarSource {
    client: SourceClient,
}

impl SemanticScholarSource {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_concurrency(api_key, 3)
    }

    pub fn with_concurrency(api_key: Option<String>, max_concurrent: usize) -> Self {
        let mut client = SourceClient::new("semantic_scholar", max_concurrent);
        if let Some(key) = api_key {
            client = client.with_header("x-api-key", key);
        }
        Self { client }
    }

    /// Fetch one side of a citation edge list (`references` or `citations`);
    /// each entry nests the far-end paper under `key`.
    async fn edge_works(
        &self,
        id: &str,
        edge: &str,
        key: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let url = format!("{S2_API_BASE}/paper/{id}/{edge}");
        let params = [
            ("fields", PAPER_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];
        let resp = self.client.get_json(&url, &params).await?;
        let data = resp["data"].as_array().cloned().unwrap_or_default();
        Ok(data.iter().map(|entry| paper_to_metadata(&entry[key])).collect())
    }
}

impl Default for SemanticScholarSource {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl BibliographicSource for SemanticScholarSource {
    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    #[instrument(skip(self))]
    async fn search_works(&self, query: &str, limit: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        let params = [
            ("query", query.to_string()),
            ("limit", limit.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];
        let resp = self.client.get_json(&format!("{S2_API_BASE}/paper/search"), &params).await?;
        let data = resp["data"].as_array().cloned().unwrap_or_default();
        debug!(n = data.len(), "Semantic Scholar search results");
        Ok(data.iter().map(paper_to_metadata).collect())
    }

    async fn get_work_by_id(&self, id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        let url = format!("{S2_API_BASE}/paper/{id}");
        match self.client.get_json(&url, &[("fields", PAPER_FIELDS.to_string())]).await {
            Ok(paper) => Ok(Some(paper_to_metadata(&paper))),
            Err(RefgraphError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_referenced_works(
        &self,
        id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        self.edge_works(id, "references", "citedPaper", limit).await
    }

    async fn get_citing_works(
        &self,
        id: &str,
        limit: usize,
        sort_by_citations: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let mut works = self.edge_works(id, "citations", "citingPaper", limit).await?;
        if sort_by_citations {
            works.sort_by(|a, b| b.cited_by_count.cmp(&a.cited_by_count));
        }
        Ok(works)
    }

    async fn search_author(&self, name: &str) -> anyhow::Result<Option<String>> {
        let params = [("query", name.to_string()), ("limit", "1".to_string())];
        let resp = self.client.get_json(&format!("{S2_API_BASE}/author/search"), &params).await?;
        Ok(resp["data"]
            .as_array()
            .and_then(|d| d.first())
            .and_then(|a| a["authorId"].as_str())
            .map(String::from))
    }

    async fn get_author_works(
        &self,
        author_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let url = format!("{S2_API_BASE}/author/{author_id}/papers");
        let params = [
            ("fields", PAPER_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];
        let resp = self.client.get_json(&url, &params).await?;
        let data = resp["data"].as_array().cloned().unwrap_or_default();
        Ok(data.iter().map(paper_to_metadata).collect())
    }

    async fn search_in_venue(
        &self,
        query: &str,
        venue: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let params = [
            ("query", query.to_string()),
            ("venue", venue.to_string()),
            ("limit", limit.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];
        let resp = self.client.get_json(&format!("{S2_API_BASE}/paper/search"), &params).await?;
        let data = resp["data"].as_array().cloned().unwrap_or_default();
        Ok(data.iter().map(paper_to_metadata).collect())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn paper_to_metadata(paper: &serde_json::Value) -> WorkMetadata {
    let authors: Vec<String> = paper["authors"]
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|a| a["name"].as_str())
        .map(String::from)
        .collect();

    let external = &paper["externalIds"];

    WorkMetadata {
        title: paper["title"].as_str().unwrap_or("").to_string(),
        authors,
        year: paper["year"].as_i64().unwrap_or(0) as i32,
        venue: paper["venue"].as_str().filter(|v| !v.is_empty()).map(String::from),
        doi: external["DOI"].as_str().map(String::from),
        source_id: paper["paperId"].as_str().map(String::from),
        preprint_id: external["ArXiv"].as_str().map(String::from),
        pmid: external["PubMed"].as_str().map(String::from),
        cited_by_count: paper["citationCount"].as_u64().unwrap_or(0) as u32,
        full_text_url: paper["openAccessPdf"]["url"].as_str().map(String::from),
    }
}
