//! Citation chain mining: graph expansion from verified seed works.
//!
//! Four relations grow the pool, each independently bounded:
//!   1. Backward chain — works cited BY each seed
//!   2. Forward chain  — works that CITE each seed, most-cited first
//!   3. Author chain   — other works by key authors
//!   4. Venue search   — topic search scoped to key venues
//!
//! One semaphore bounds all fetches across the whole expansion; one dedup
//! index spans all four relations. Expansion halts the moment the pool cap
//! is reached. A failed fetch contributes zero candidates, never an error.

use std::sync::Arc;

use refgraph_sources::{BibliographicSource, WorkMetadata};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::pool::{Candidate, CandidatePool, SourcePhase};
use crate::progress::ProgressSink;

const EXPANSION_CONCURRENCY: usize = 3;
const BACKWARD_LIMIT: usize = 30;
const FORWARD_LIMIT: usize = 20;
const AUTHOR_LIMIT: usize = 15;
const VENUE_LIMIT: usize = 15;

/// A verified work used as an expansion starting point.
#[derive(Debug, Clone)]
pub struct SeedWork {
    /// Source-native id the graph source can expand from.
    pub source_id: String,
    pub title: String,
    pub doi: Option<String>,
}

/// Input to one expansion run.
#[derive(Debug, Clone)]
pub struct ExpansionSeeds {
    pub seeds: Vec<SeedWork>,
    pub key_authors: Vec<String>,
    pub key_venues: Vec<String>,
    pub topic_query: String,
    pub max_total: usize,
}

/// Mines citation chains from seed works via a graph-capable source.
pub struct CitationChainMiner {
    source: Arc<dyn BibliographicSource>,
}

impl CitationChainMiner {
    pub fn new(source: Arc<dyn BibliographicSource>) -> Self {
        Self { source }
    }

    /// Full expansion: backward + forward + author + venue search.
    ///
    /// Progress is reported as completed-steps over total steps after each
    /// seed, author, and venue is processed.
    pub async fn expand_from_seeds(
        &self,
        request: &ExpansionSeeds,
        progress: &dyn ProgressSink,
    ) -> Vec<Candidate> {
        let mut pool = CandidatePool::new(request.max_total);
        for seed in &request.seeds {
            if let Some(doi) = &seed.doi {
                pool.mark_seen(doi);
            }
        }

        let sem = Semaphore::new(EXPANSION_CONCURRENCY);
        let total_steps =
            (request.seeds.len() * 2 + request.key_authors.len() + request.key_venues.len()).max(1);
        let mut step = 0usize;

        // 1. Backward chain for each seed
        for seed in &request.seeds {
            if pool.is_full() {
                break;
            }
            let refs = self.references_of(&sem, &seed.source_id).await;
            let added = add_all(&mut pool, refs, SourcePhase::CitationChain);
            step += 1;
            report_step(progress, step, total_steps).await;
            debug!(seed = seed.title.as_str(), added, "backward chain processed");
        }

        // 2. Forward chain for each seed
        for seed in &request.seeds {
            if pool.is_full() {
                break;
            }
            let citing = self.citing_of(&sem, &seed.source_id).await;
            let added = add_all(&mut pool, citing, SourcePhase::CitationChain);
            step += 1;
            report_step(progress, step, total_steps).await;
            debug!(seed = seed.title.as_str(), added, "forward chain processed");
        }

        // 3. Author chain
        for author in &request.key_authors {
            if pool.is_full() {
                break;
            }
            let works = self.author_works(&sem, author).await;
            let added = add_all(&mut pool, works, SourcePhase::AuthorChain);
            step += 1;
            report_step(progress, step, total_steps).await;
            debug!(author = author.as_str(), added, "author chain processed");
        }

        // 4. Venue search
        for venue in &request.key_venues {
            if pool.is_full() {
                break;
            }
            let works = self.venue_works(&sem, &request.topic_query, venue).await;
            let added = add_all(&mut pool, works, SourcePhase::VenueSearch);
            step += 1;
            report_step(progress, step, total_steps).await;
            debug!(venue = venue.as_str(), added, "venue search processed");
        }

        info!(
            candidates = pool.len(),
            seeds = request.seeds.len(),
            authors = request.key_authors.len(),
            venues = request.key_venues.len(),
            "citation chain expansion complete"
        );
        pool.into_entries()
    }

    async fn references_of(&self, sem: &Semaphore, id: &str) -> Vec<WorkMetadata> {
        let _permit = sem.acquire().await.expect("semaphore closed");
        match self.source.get_referenced_works(id, BACKWARD_LIMIT).await {
            Ok(works) => works,
            Err(e) => {
                warn!(%id, error = %e, "failed to get referenced works");
                Vec::new()
            }
        }
    }

    async fn citing_of(&self, sem: &Semaphore, id: &str) -> Vec<WorkMetadata> {
        let _permit = sem.acquire().await.expect("semaphore closed");
        match self.source.get_citing_works(id, FORWARD_LIMIT, true).await {
            Ok(works) => works,
            Err(e) => {
                warn!(%id, error = %e, "failed to get citing works");
                Vec::new()
            }
        }
    }

    /// Resolve the author name first; an unresolvable author contributes
    /// zero candidates.
    async fn author_works(&self, sem: &Semaphore, name: &str) -> Vec<WorkMetadata> {
        let _permit = sem.acquire().await.expect("semaphore closed");
        let author_id = match self.source.search_author(name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(author = name, "author not found on source");
                return Vec::new();
            }
            Err(e) => {
                warn!(author = name, error = %e, "author resolution failed");
                return Vec::new();
            }
        };
        match self.source.get_author_works(&author_id, AUTHOR_LIMIT).await {
            Ok(works) => works,
            Err(e) => {
                warn!(author = name, error = %e, "failed to get author works");
                Vec::new()
            }
        }
    }

    async fn venue_works(&self, sem: &Semaphore, query: &str, venue: &str) -> Vec<WorkMetadata> {
        let _permit = sem.acquire().await.expect("semaphore closed");
        match self.source.search_in_venue(query, venue, VENUE_LIMIT).await {
            Ok(works) => works,
            Err(e) => {
                warn!(venue, error = %e, "venue search failed");
                Vec::new()
            }
        }
    }
}

fn add_all(pool: &mut CandidatePool, works: Vec<WorkMetadata>, phase: SourcePhase) -> usize {
    let mut added = 0;
    for work in works {
        if pool.is_full() {
            break;
        }
        if pool.try_push(work, phase) {
            added += 1;
        }
    }
    added
}

async fn report_step(progress: &dyn ProgressSink, step: usize, total: usize) {
    let frac = step as f64 / total as f64;
    progress
        .report(frac, &format!("Expanding citations ({step}/{total})"))
        .await;
}
