//! Allowlist-capped HTTP client with per-source concurrency and retry.
//!
//! Every outbound call in refgraph goes through a [`SourceClient`]: a named
//! wrapper over `reqwest` that caps concurrent in-flight requests with a
//! counting semaphore, refuses URLs whose host is not on the scholarly-API
//! allowlist, and retries rate-limit and transient faults with exponential
//! backoff. Exhausting the retry budget surfaces the last error; callers
//! treat that as "source unavailable" and continue with other sources.

use std::collections::HashSet;
use std::time::Duration;

use refgraph_common::RefgraphError;
use reqwest::{Client, ClientBuilder};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = "refgraph/0.1 (academic-research-tool; mailto:refgraph@example.com)";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

/// Hosts any `SourceClient` may talk to by default.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "api.openalex.org",        // OpenAlex
    "api.crossref.org",        // Crossref
    "api.semanticscholar.org", // Semantic Scholar
    "api.unpaywall.org",       // Unpaywall
    "api.core.ac.uk",          // CORE
    "www.ebi.ac.uk",           // Europe PMC REST
    "europepmc.org",           // Europe PMC render endpoint
    "arxiv.org",               // arXiv PDFs
    "export.arxiv.org",        // arXiv API
    "doi.org",                 // DOI resolution / content negotiation
    "localhost",
    "127.0.0.1",
];

/// Exponential backoff: 2^attempt seconds (1s, 2s, 4s, ...).
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// A named outbound client for one external source.
pub struct SourceClient {
    name: &'static str,
    client: Client,
    semaphore: Semaphore,
    allowlist: HashSet<String>,
    headers: Vec<(String, String)>,
}

impl SourceClient {
    /// Build a client for `name` with at most `max_concurrent` in-flight
    /// requests and the default timeout.
    pub fn new(name: &'static str, max_concurrent: usize) -> Self {
        Self::with_timeout(name, max_concurrent, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(name: &'static str, max_concurrent: usize, timeout: Duration) -> Self {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("HTTP client build failed");

        Self {
            name,
            client,
            semaphore: Semaphore::new(max_concurrent),
            allowlist: DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect(),
            headers: Vec::new(),
        }
    }

    /// Attach a header to every request (e.g. `x-api-key`).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Whether a URL's host is permitted (exact match or subdomain).
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }

    /// GET a JSON document with rate limiting and retries.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, RefgraphError> {
        if !self.is_allowed(url) {
            return Err(RefgraphError::BlockedDomain(url.to_string()));
        }

        let mut last_err: Option<RefgraphError> = None;
        for attempt in 0..MAX_ATTEMPTS {
            let result = {
                // Permit is held only for the request itself, not the backoff sleep.
                let _permit = self.semaphore.acquire().await.expect("semaphore closed");
                self.execute(url, params).await
            };

            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                    let wait = match &e {
                        RefgraphError::RateLimited { .. } => backoff_duration(attempt + 1),
                        _ => backoff_duration(attempt),
                    };
                    debug!(
                        source = self.name,
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs(),
                        error = %e,
                        "retrying source request"
                    );
                    tokio::time::sleep(wait).await;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let err = last_err.unwrap_or_else(|| RefgraphError::Transient {
            source_name: self.name.to_string(),
            message: "request failed after retries".to_string(),
        });
        warn!(source = self.name, error = %err, "source request exhausted retries");
        Err(err)
    }

    /// HEAD request with an `Accept` header; redirects are followed.
    /// Used for DOI content negotiation. Not retried: a miss is a miss.
    pub async fn head(
        &self,
        url: &str,
        accept: &str,
    ) -> Result<reqwest::Response, RefgraphError> {
        if !self.is_allowed(url) {
            return Err(RefgraphError::BlockedDomain(url.to_string()));
        }
        let _permit = self.semaphore.acquire().await.expect("semaphore closed");
        self.client
            .head(url)
            .header("Accept", accept)
            .send()
            .await
            .map_err(|e| RefgraphError::Transient {
                source_name: self.name.to_string(),
                message: e.to_string(),
            })
    }

    async fn execute(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value, RefgraphError> {
        let mut req = self.client.get(url).query(params);
        for (name, value) in &self.headers {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(|e| RefgraphError::Transient {
            source_name: self.name.to_string(),
            message: e.to_string(),
        })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(RefgraphError::RateLimited { source_name: self.name.to_string() });
        }
        if !status.is_success() {
            return Err(RefgraphError::Status {
                source_name: self.name.to_string(),
                status: status.as_u16(),
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
