//! CORE full-text index lookup.
//!
//! Direct DOI search first; a title search is only accepted when the hit's
//! title matches at word-set similarity >= 0.8.

use std::time::Duration;

use async_trait::async_trait;
use refgraph_common::matching::jaccard_similarity;
use tracing::debug;

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::OaStrategy;

const CORE_API_BASE: &str = "https://api.core.ac.uk/v3";
const TITLE_MATCH_THRESHOLD: f64 = 0.8;

pub struct CoreStrategy {
    client: SourceClient,
}

impl CoreStrategy {
    pub fn new(api_key: Option<String>) -> Self {
        let mut client = SourceClient::with_timeout("core", 5, Duration::from_secs(15));
        if let Some(key) = api_key {
            client = client.with_header("Authorization", format!("Bearer {key}"));
        }
        Self { client }
    }

    async fn search(&self, query: String, limit: usize) -> Option<Vec<serde_json::Value>> {
        let url = format!("{CORE_API_BASE}/search/works");
        let params = [("q", query), ("limit", limit.to_string())];
        match self.client.get_json(&url, &params).await {
            Ok(data) => data["results"].as_array().cloned(),
            Err(e) => {
                debug!(error = %e, "CORE search failed");
                None
            }
        }
    }
}

#[async_trait]
impl OaStrategy for CoreStrategy {
    fn name(&self) -> &'static str {
        "core"
    }

    async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        if let Some(doi) = work.normalized_doi() {
            if let Some(results) = self.search(format!("doi:\"{doi}\""), 1).await {
                if let Some(url) = results.first().and_then(|r| r["downloadUrl"].as_str()) {
                    if !url.is_empty() {
                        return Some(url.to_string());
                    }
                }
            }
        }

        if work.title.is_empty() {
            return None;
        }
        let results = self.search(format!("title:\"{}\"", work.title), 5).await?;
        for result in &results {
            let candidate_title = result["title"].as_str().unwrap_or("");
            if jaccard_similarity(&work.title, candidate_title) >= TITLE_MATCH_THRESHOLD {
                if let Some(url) = result["downloadUrl"].as_str() {
                    if !url.is_empty() {
                        return Some(url.to_string());
                    }
                }
            }
        }
        None
    }
}
