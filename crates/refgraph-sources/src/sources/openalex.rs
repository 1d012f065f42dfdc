//! OpenAlex API client.
//!
//! The only source serving the full citation-graph surface: backward
//! references (batch fetch over `referenced_works`), forward citations
//! (`cites:` filter), author resolution, and venue-scoped search.
//!
//! API: https://api.openalex.org
//! Polite pool: pass the `mailto` param (see OpenAlex etiquette).

use async_trait::async_trait;
use refgraph_common::RefgraphError;
use tracing::{debug, instrument};

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::BibliographicSource;

const OA_API_BASE: &str = "https://api.openalex.org";
const WORK_SELECT: &str =
    "id,title,authorships,publication_year,primary_location,doi,cited_by_count,ids";

pub struct OpenAlexSource {
    client: SourceClient,
    mailto: Option<String>,
}

impl OpenAlexSource {
    pub fn new(mailto: Option<String>) -> Self {
        Self::with_concurrency(mailto, 10)
    }

    pub fn with_concurrency(mailto: Option<String>, max_concurrent: usize) -> Self {
        Self {
            client: SourceClient::new("openalex", max_concurrent),
            mailto,
        }
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        match &self.mailto {
            Some(email) => vec![("mailto", email.clone())],
            None => Vec::new(),
        }
    }

    async fn list_works(
        &self,
        mut params: Vec<(&'static str, String)>,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        params.extend(self.base_params());
        params.push(("select", WORK_SELECT.to_string()));
        let resp = self.client.get_json(&format!("{OA_API_BASE}/works"), &params).await?;
        let works = resp["results"].as_array().cloned().unwrap_or_default();
        Ok(works.iter().map(work_to_metadata).collect())
    }
}

impl Default for OpenAlexSource {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl BibliographicSource for OpenAlexSource {
    fn name(&self) -> &'static str {
        "openalex"
    }

    #[instrument(skip(self))]
    async fn search_works(&self, query: &str, limit: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        let works = self
            .list_works(vec![
                ("search", query.to_string()),
                ("per_page", limit.to_string()),
            ])
            .await?;
        debug!(n = works.len(), "OpenAlex search results");
        Ok(works)
    }

    async fn get_work_by_id(&self, id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        let mut params = self.base_params();
        params.push(("select", WORK_SELECT.to_string()));
        let work_id = id.rsplit('/').next().unwrap_or(id);
        match self.client.get_json(&format!("{OA_API_BASE}/works/{work_id}"), &params).await {
            Ok(work) => Ok(Some(work_to_metadata(&work))),
            Err(RefgraphError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Backward chain: fetch the work, then batch-fetch its
    /// `referenced_works` ids with an `openalex_id:` filter.
    #[instrument(skip(self))]
    async fn get_referenced_works(
        &self,
        id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let work_id = id.rsplit('/').next().unwrap_or(id);
        let work = self
            .client
            .get_json(&format!("{OA_API_BASE}/works/{work_id}"), &self.base_params())
            .await?;

        let ref_ids: Vec<&str> = work["referenced_works"]
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str())
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default();
        if ref_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.list_works(vec![
            ("filter", format!("openalex_id:{}", ref_ids.join("|"))),
            ("per_page", limit.to_string()),
        ])
        .await
    }

    #[instrument(skip(self))]
    async fn get_citing_works(
        &self,
        id: &str,
        limit: usize,
        sort_by_citations: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let work_id = id.rsplit('/').next().unwrap_or(id);
        let mut params = vec![
            ("filter", format!("cites:{work_id}")),
            ("per_page", limit.to_string()),
        ];
        if sort_by_citations {
            params.push(("sort", "cited_by_count:desc".to_string()));
        }
        self.list_works(params).await
    }

    async fn search_author(&self, name: &str) -> anyhow::Result<Option<String>> {
        let mut params = self.base_params();
        params.push(("search", name.to_string()));
        params.push(("per_page", "1".to_string()));
        let resp = self.client.get_json(&format!("{OA_API_BASE}/authors"), &params).await?;
        Ok(resp["results"]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|a| a["id"].as_str())
            .map(String::from))
    }

    async fn get_author_works(
        &self,
        author_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        let author_id = author_id.rsplit('/').next().unwrap_or(author_id);
        self.list_works(vec![
            ("filter", format!("authorships.author.id:{author_id}")),
            ("sort", "cited_by_count:desc".to_string()),
            ("per_page", limit.to_string()),
        ])
        .await
    }

    async fn search_in_venue(
        &self,
        query: &str,
        venue: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        self.list_works(vec![
            ("search", query.to_string()),
            (
                "filter",
                format!("primary_location.source.display_name.search:{venue}"),
            ),
            ("per_page", limit.to_string()),
        ])
        .await
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn work_to_metadata(work: &serde_json::Value) -> WorkMetadata {
    let authors: Vec<String> = work["authorships"]
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|a| a["author"]["display_name"].as_str())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    let venue = work["primary_location"]["source"]["display_name"]
        .as_str()
        .map(String::from);

    let doi = work["doi"]
        .as_str()
        .map(|d| d.replace("https://doi.org/", ""))
        .filter(|d| !d.is_empty());

    let pmid = work["ids"]["pmid"]
        .as_str()
        .map(|p| p.replace("https://pubmed.ncbi.nlm.nih.gov/", ""))
        .filter(|p| !p.is_empty());

    WorkMetadata {
        title: work["title"].as_str().unwrap_or("").to_string(),
        authors,
        year: work["publication_year"].as_i64().unwrap_or(0) as i32,
        venue,
        doi,
        source_id: work["id"].as_str().map(String::from),
        preprint_id: None,
        pmid,
        cited_by_count: work["cited_by_count"].as_u64().unwrap_or(0) as u32,
        full_text_url: None,
    }
}
