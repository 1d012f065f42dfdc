//! Unpaywall lookup: DOI-keyed open-access registry.
//!
//! Best-known location first, then the alternates.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::client::SourceClient;
use crate::models::WorkMetadata;

use super::OaStrategy;

const UNPAYWALL_API_BASE: &str = "https://api.unpaywall.org/v2";

pub struct UnpaywallStrategy {
    client: SourceClient,
    email: String,
}

impl UnpaywallStrategy {
    pub fn new(mailto: Option<String>) -> Self {
        Self {
            client: SourceClient::with_timeout("unpaywall", 10, Duration::from_secs(15)),
            email: mailto.unwrap_or_else(|| "refgraph@example.com".to_string()),
        }
    }
}

#[async_trait]
impl OaStrategy for UnpaywallStrategy {
    fn name(&self) -> &'static str {
        "unpaywall"
    }

    async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        let doi = work.normalized_doi()?;
        let url = format!("{UNPAYWALL_API_BASE}/{doi}");
        let data = match self.client.get_json(&url, &[("email", self.email.clone())]).await {
            Ok(data) => data,
            Err(e) => {
                debug!(%doi, error = %e, "Unpaywall lookup failed");
                return None;
            }
        };

        if let Some(best) = data["best_oa_location"]["url_for_pdf"].as_str() {
            return Some(best.to_string());
        }

        data["oa_locations"]
            .as_array()
            .and_then(|locs| {
                locs.iter()
                    .find_map(|loc| loc["url_for_pdf"].as_str())
            })
            .map(String::from)
    }
}
