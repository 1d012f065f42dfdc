//! DOI content negotiation: a HEAD request against the resolver asking for
//! `application/pdf`. Counts as a hit only when the response reports success
//! AND a matching content type.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::OaStrategy;

pub struct DoiNegotiationStrategy {
    client: SourceClient,
}

impl DoiNegotiationStrategy {
    pub fn new() -> Self {
        Self {
            client: SourceClient::with_timeout("doi_negotiation", 5, Duration::from_secs(15)),
        }
    }
}

impl Default for DoiNegotiationStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OaStrategy for DoiNegotiationStrategy {
    fn name(&self) -> &'static str {
        "doi_negotiation"
    }

    async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        let doi = work.normalized_doi()?;
        let resp = match self.client.head(&format!("https://doi.org/{doi}"), "application/pdf").await
        {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%doi, error = %e, "DOI content negotiation failed");
                return None;
            }
        };

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if resp.status().is_success() && content_type.contains("application/pdf") {
            Some(resp.url().to_string())
        } else {
            None
        }
    }
}
