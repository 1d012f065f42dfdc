//! Open-access full-text resolution.
//!
//! Strategies are tried in a fixed priority order and the chain stops at the
//! first hit. A strategy swallows its own failures and answers `None`; one
//! broken source must never prevent trying the next.

pub mod core;
pub mod europepmc;
pub mod negotiation;
pub mod preprint;
pub mod unpaywall;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::info;

use crate::models::WorkMetadata;

/// One way of locating full text for a work.
#[async_trait]
pub trait OaStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// A full-text URL, or `None`. Must not propagate errors.
    async fn resolve(&self, work: &WorkMetadata) -> Option<String>;
}

/// Priority-ordered chain of full-text strategies.
pub struct OaResolver {
    strategies: Vec<Arc<dyn OaStrategy>>,
}

impl OaResolver {
    /// Default chain: Unpaywall, CORE, arXiv templating, Europe PMC,
    /// DOI content negotiation.
    pub fn new(mailto: Option<String>, core_api_key: Option<String>) -> Self {
        Self::with_strategies(vec![
            Arc::new(unpaywall::UnpaywallStrategy::new(mailto)),
            Arc::new(core::CoreStrategy::new(core_api_key)),
            Arc::new(preprint::PreprintStrategy),
            Arc::new(europepmc::EuropePmcStrategy::new()),
            Arc::new(negotiation::DoiNegotiationStrategy::new()),
        ])
    }

    pub fn with_strategies(strategies: Vec<Arc<dyn OaStrategy>>) -> Self {
        Self { strategies }
    }

    /// First-success resolution over the strategy chain.
    pub async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(url) = strategy.resolve(work).await {
                info!(
                    strategy = strategy.name(),
                    title = work.title.as_str(),
                    %url,
                    "full text resolved"
                );
                return Some(url);
            }
        }
        None
    }

    /// Resolve a batch concurrently (at most 10 in flight).
    ///
    /// Returns exactly one entry per input, in input order; an unresolvable
    /// record yields `None` rather than being dropped.
    pub async fn resolve_many(&self, works: &[WorkMetadata]) -> Vec<Option<String>> {
        let sem = Semaphore::new(10);
        let futures = works.iter().map(|work| {
            let sem = &sem;
            async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                self.resolve(work).await
            }
        });
        join_all(futures).await
    }
}
