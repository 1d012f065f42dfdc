//! Europe PMC lookup: resolves a DOI or PMID to a PMCID, then a PDF
//! rendering endpoint URL.
//!
//! Endpoint: https://www.ebi.ac.uk/europepmc/webservices/rest/search

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::OaStrategy;

const EPMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";
const EPMC_RENDER_URL: &str = "https://europepmc.org/backend/ptpmcrender.fcgi";

pub struct EuropePmcStrategy {
    client: SourceClient,
}

impl EuropePmcStrategy {
    pub fn new() -> Self {
        Self {
            client: SourceClient::with_timeout("europepmc", 5, Duration::from_secs(15)),
        }
    }
}

impl Default for EuropePmcStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OaStrategy for EuropePmcStrategy {
    fn name(&self) -> &'static str {
        "europepmc"
    }

    async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        let query = if let Some(doi) = work.normalized_doi() {
            format!("DOI:{doi}")
        } else if let Some(pmid) = &work.pmid {
            format!("EXT_ID:{pmid}")
        } else {
            return None;
        };

        let params = [
            ("query", query),
            ("format", "json".to_string()),
            ("resultType", "core".to_string()),
            ("pageSize", "1".to_string()),
        ];
        let data = match self.client.get_json(EPMC_SEARCH_URL, &params).await {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "Europe PMC lookup failed");
                return None;
            }
        };

        let pmcid = data["resultList"]["result"]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|r| r["pmcid"].as_str())?;

        Some(format!("{EPMC_RENDER_URL}?accid={pmcid}&blobtype=pdf"))
    }
}
