//! The smart reference pipeline: blueprint -> verify -> expand -> curate -> persist.
//!
//! One run executes the five phases exactly once, in order. Each phase owns
//! a slice of the [0, 1] progress range and degrades to an empty or fallback
//! result on failure; the only run-level error is an invalid request. The
//! run always reaches the persist phase and returns a populated report.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use refgraph_common::matching::{jaccard_similarity, normalize_title};
use refgraph_common::RefgraphError;
use refgraph_llm::{LlmBackend, LlmRequest};
use refgraph_sources::{BibliographicSource, WorkMetadata};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::blueprint::{blueprint_prompt, curation_prompt, Blueprint, SuggestedWork};
use crate::chain::{CitationChainMiner, ExpansionSeeds, SeedWork};
use crate::pool::{Candidate, DedupIndex, SourcePhase};
use crate::progress::{ProgressSink, SubrangeProgress};
use crate::store::ReferenceStore;

const VERIFY_THRESHOLD: f64 = 0.5;
const VERIFY_CONCURRENCY: usize = 5;
const VERIFY_SEARCH_LIMIT: usize = 5;
const SEED_RESOLVE_CAP: usize = 10;
const DEFAULT_MAX_POOL: usize = 200;

// ── Request ───────────────────────────────────────────────────────────────────

/// Parameters for a single pipeline run.
#[derive(Debug, Clone)]
pub struct ReferenceRequest {
    pub topic_title: String,
    pub research_question: String,
    pub gap_description: String,
    /// How many references curation should aim for.
    pub target_count: usize,
}

// ── Per-phase results ─────────────────────────────────────────────────────────

/// Outcome of verifying one blueprint suggestion.
#[derive(Debug, Clone)]
pub struct VerifiedReference {
    pub original: SuggestedWork,
    /// Blueprint category the suggestion came from.
    pub category: String,
    pub work: Option<WorkMetadata>,
    /// Name of the source that matched, or "unverified".
    pub source: String,
    pub match_confidence: f64,
}

impl VerifiedReference {
    pub fn is_verified(&self) -> bool {
        self.work.is_some()
    }

    fn unverified(original: SuggestedWork, category: String) -> Self {
        Self {
            original,
            category,
            work: None,
            source: "unverified".to_string(),
            match_confidence: 0.0,
        }
    }
}

/// One curated selection in the final reference list.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedReference {
    pub work: WorkMetadata,
    pub category: String,
    /// 1 = essential, 2 = important, 3 = optional.
    pub tier: u8,
    pub usage_note: String,
    pub source_phase: SourcePhase,
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Summary of one completed run. Always produced, even when every external
/// collaborator was unreachable.
#[derive(Debug, Clone, Serialize)]
pub struct SmartSearchReport {
    pub topic: String,
    pub blueprint_suggested: usize,
    pub verified: usize,
    pub hallucinated: usize,
    pub expanded_pool: usize,
    pub final_selected: usize,
    pub categories: BTreeMap<String, usize>,
    pub tier_counts: BTreeMap<u8, usize>,
    pub gaps: Vec<String>,
    pub references: Vec<CuratedReference>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SmartSearchReport {
    pub fn summary(&self) -> String {
        format!(
            "Smart search: '{}'\n  \
             Blueprint suggested: {}\n  \
             Verified: {} | Hallucinated: {}\n  \
             Expanded pool: {}\n  \
             Final selected: {}\n  \
             Categories: {:?}\n  \
             Tiers: {:?}\n  \
             Gaps: {:?}",
            self.topic,
            self.blueprint_suggested,
            self.verified,
            self.hallucinated,
            self.expanded_pool,
            self.final_selected,
            self.categories,
            self.tier_counts,
            self.gaps,
        )
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Five-phase smart reference pipeline.
///
/// Collaborators are shared, read-only-after-construction, and safe across
/// concurrent runs; all per-run state lives on the stack of [`Self::run`].
pub struct SmartReferencePipeline {
    /// Verification-first source (combined author+title query).
    primary: Arc<dyn BibliographicSource>,
    /// Fallback verification source; also serves the citation graph.
    secondary: Arc<dyn BibliographicSource>,
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn ReferenceStore>,
    max_pool: usize,
}

impl SmartReferencePipeline {
    pub fn new(
        primary: Arc<dyn BibliographicSource>,
        secondary: Arc<dyn BibliographicSource>,
        llm: Arc<dyn LlmBackend>,
        store: Arc<dyn ReferenceStore>,
    ) -> Self {
        Self {
            primary,
            secondary,
            llm,
            store,
            max_pool: DEFAULT_MAX_POOL,
        }
    }

    pub fn with_max_pool(mut self, max_pool: usize) -> Self {
        self.max_pool = max_pool;
        self
    }

    /// Execute the full five-phase run.
    #[instrument(skip(self, progress), fields(topic = %request.topic_title))]
    pub async fn run(
        &self,
        request: &ReferenceRequest,
        progress: &dyn ProgressSink,
    ) -> anyhow::Result<SmartSearchReport> {
        if request.topic_title.trim().is_empty() {
            return Err(
                RefgraphError::Config("reference request has an empty topic title".to_string())
                    .into(),
            );
        }

        let started_at = Utc::now();
        let t0 = std::time::Instant::now();
        info!("starting smart reference search");

        // Phase 1: Blueprint (0.00 -> 0.15)
        progress.report(0.0, "Generating bibliography blueprint").await;
        let blueprint = self.generate_blueprint(request).await;
        let blueprint_suggested = blueprint.total_suggested();
        progress
            .report(
                0.15,
                &format!(
                    "Blueprint: {blueprint_suggested} suggestions in {} categories",
                    blueprint.categories.len()
                ),
            )
            .await;

        // Phase 2: Verification (0.15 -> 0.40)
        let verified_all = self.verify_references(&blueprint, progress).await;
        let verified: Vec<VerifiedReference> =
            verified_all.iter().filter(|v| v.is_verified()).cloned().collect();
        let hallucinated = verified_all.len() - verified.len();
        progress
            .report(
                0.40,
                &format!("Verified {}/{} suggestions", verified.len(), verified_all.len()),
            )
            .await;

        // Phase 3: Citation chain expansion (0.40 -> 0.75)
        let candidates = self.expand_citations(&verified, &blueprint, request, progress).await;
        progress
            .report(0.75, &format!("Expanded pool: {} candidates", candidates.len()))
            .await;

        // Phase 4: Curation (0.75 -> 0.90)
        progress.report(0.75, "Curating final reference list").await;
        let (curated, gaps) = self
            .curate_references(&candidates, &verified, &blueprint, request)
            .await;
        progress
            .report(0.90, &format!("Selected {} references", curated.len()))
            .await;

        // Phase 5: Persist (0.90 -> 1.00)
        progress.report(0.90, "Saving curated references").await;
        self.persist_results(&curated).await;
        progress.report(1.0, "Smart search complete").await;

        let mut report = SmartSearchReport {
            topic: request.topic_title.clone(),
            blueprint_suggested,
            verified: verified.len(),
            hallucinated,
            expanded_pool: candidates.len(),
            final_selected: curated.len(),
            categories: BTreeMap::new(),
            tier_counts: BTreeMap::new(),
            gaps,
            references: curated,
            started_at,
            duration_ms: t0.elapsed().as_millis() as u64,
        };
        for reference in &report.references {
            *report.categories.entry(reference.category.clone()).or_insert(0) += 1;
            *report.tier_counts.entry(reference.tier).or_insert(0) += 1;
        }

        info!("{}", report.summary());
        Ok(report)
    }

    // ── Phase 1: Blueprint ────────────────────────────────────────────────────

    async fn generate_blueprint(&self, request: &ReferenceRequest) -> Blueprint {
        let prompt = blueprint_prompt(
            &request.topic_title,
            &request.research_question,
            &request.gap_description,
        );
        match self.llm.complete(LlmRequest::prompt(prompt)).await {
            Ok(resp) => Blueprint::parse(&resp.content),
            Err(e) => {
                warn!(error = %e, "blueprint generation failed, continuing with empty blueprint");
                Blueprint::default()
            }
        }
    }

    // ── Phase 2: Verification ─────────────────────────────────────────────────

    async fn verify_references(
        &self,
        blueprint: &Blueprint,
        progress: &dyn ProgressSink,
    ) -> Vec<VerifiedReference> {
        let suggestions: Vec<(String, SuggestedWork)> = blueprint
            .categories
            .iter()
            .flat_map(|cat| {
                cat.suggested_refs
                    .iter()
                    .map(|s| (cat.name.clone(), s.clone()))
            })
            .collect();

        if suggestions.is_empty() {
            return Vec::new();
        }

        let total = suggestions.len();
        let sem = Semaphore::new(VERIFY_CONCURRENCY);
        let mut futures: FuturesUnordered<_> = suggestions
            .into_iter()
            .map(|(category, suggestion)| {
                let sem = &sem;
                async move {
                    let _permit = sem.acquire().await.expect("semaphore closed");
                    self.verify_single(category, suggestion).await
                }
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        while let Some(result) = futures.next().await {
            results.push(result);
            let done = results.len();
            if done % 5 == 0 || done == total {
                progress
                    .report(
                        0.15 + 0.25 * done as f64 / total as f64,
                        &format!("Verifying suggestions ({done}/{total})"),
                    )
                    .await;
            }
        }
        results
    }

    /// Verify one suggestion: primary source by combined author+title query,
    /// then secondary source by title only; first match at similarity >= 0.5
    /// wins. Source failures count as a miss for that source only.
    async fn verify_single(&self, category: String, suggestion: SuggestedWork) -> VerifiedReference {
        if suggestion.title.is_empty() {
            return VerifiedReference::unverified(suggestion, category);
        }

        let wanted = normalize_title(&suggestion.title);
        let query = if suggestion.author.is_empty() {
            suggestion.title.clone()
        } else {
            format!("{} {}", suggestion.author, suggestion.title)
        };

        match self.primary.search_works(&query, VERIFY_SEARCH_LIMIT).await {
            Ok(items) => {
                for item in items {
                    let sim = jaccard_similarity(&wanted, &normalize_title(&item.title));
                    if sim >= VERIFY_THRESHOLD {
                        return VerifiedReference {
                            original: suggestion,
                            category,
                            source: self.primary.name().to_string(),
                            match_confidence: sim,
                            work: Some(item),
                        };
                    }
                }
            }
            Err(e) => {
                debug!(title = suggestion.title.as_str(), error = %e, "primary verification failed");
            }
        }

        match self.secondary.search_works(&suggestion.title, VERIFY_SEARCH_LIMIT).await {
            Ok(items) => {
                for item in items {
                    let sim = jaccard_similarity(&wanted, &normalize_title(&item.title));
                    if sim >= VERIFY_THRESHOLD {
                        return VerifiedReference {
                            original: suggestion,
                            category,
                            source: self.secondary.name().to_string(),
                            match_confidence: sim,
                            work: Some(item),
                        };
                    }
                }
            }
            Err(e) => {
                debug!(title = suggestion.title.as_str(), error = %e, "secondary verification failed");
            }
        }

        VerifiedReference::unverified(suggestion, category)
    }

    // ── Phase 3: Citation chain expansion ─────────────────────────────────────

    async fn expand_citations(
        &self,
        verified: &[VerifiedReference],
        blueprint: &Blueprint,
        request: &ReferenceRequest,
        progress: &dyn ProgressSink,
    ) -> Vec<Candidate> {
        let mut seeds: Vec<SeedWork> = verified
            .iter()
            .filter_map(|v| {
                let work = v.work.as_ref()?;
                let source_id = work.source_id.clone()?;
                Some(SeedWork {
                    source_id,
                    title: work.title.clone(),
                    doi: work.doi.clone(),
                })
            })
            .collect();

        // No graph-capable ids among the verified works: resolve a few by
        // title search before giving up on expansion.
        if seeds.is_empty() {
            for v in verified.iter().take(SEED_RESOLVE_CAP) {
                let Some(work) = v.work.as_ref() else { continue };
                match self.secondary.search_works(&work.title, 1).await {
                    Ok(items) => {
                        if let Some(found) = items.into_iter().next() {
                            if let Some(source_id) = found.source_id {
                                seeds.push(SeedWork {
                                    source_id,
                                    title: work.title.clone(),
                                    doi: work.doi.clone(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        debug!(title = work.title.as_str(), error = %e, "seed resolution failed");
                    }
                }
            }
        }

        let miner = CitationChainMiner::new(self.secondary.clone());
        let expansion = ExpansionSeeds {
            seeds,
            key_authors: blueprint.all_key_authors(),
            key_venues: blueprint.all_key_venues(),
            topic_query: request.topic_title.clone(),
            max_total: self.max_pool,
        };
        let subrange = SubrangeProgress::new(progress, 0.40, 0.35);
        miner.expand_from_seeds(&expansion, &subrange).await
    }

    // ── Phase 4: Curation ─────────────────────────────────────────────────────

    async fn curate_references(
        &self,
        candidates: &[Candidate],
        verified: &[VerifiedReference],
        blueprint: &Blueprint,
        request: &ReferenceRequest,
    ) -> (Vec<CuratedReference>, Vec<String>) {
        // Combined pool: verified first (they take dedup priority), then
        // expansion candidates.
        let mut index = DedupIndex::new();
        let mut pool: Vec<(WorkMetadata, SourcePhase)> = Vec::new();
        for v in verified {
            if let Some(work) = &v.work {
                if index.try_insert(work.doi.as_deref()) {
                    pool.push((work.clone(), SourcePhase::Blueprint));
                }
            }
        }
        for candidate in candidates {
            if index.try_insert(candidate.work.doi.as_deref()) {
                pool.push((candidate.work.clone(), candidate.phase));
            }
        }

        if pool.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let categories_description: String = blueprint
            .categories
            .iter()
            .map(|c| format!("- **{}**: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n");

        let candidates_text: String = pool
            .iter()
            .enumerate()
            .map(|(i, (work, _))| {
                let authors = work.authors.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
                format!(
                    "{i}. {authors} ({year}). \"{title}\". {venue}",
                    year = work.year,
                    title = work.title,
                    venue = work.venue.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let target = request.target_count.min(pool.len());
        let prompt = curation_prompt(
            &request.topic_title,
            &request.research_question,
            target,
            &categories_description,
            pool.len(),
            &candidates_text,
        );

        let response = match self.llm.complete(LlmRequest::prompt(prompt)).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(error = %e, "curation request failed, selecting all verified");
                return (fallback_selection(verified), Vec::new());
            }
        };

        let data = match refgraph_llm::extract_json(&response) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "curation response not valid JSON, selecting all verified");
                return (fallback_selection(verified), Vec::new());
            }
        };

        let mut curated = Vec::new();
        for sel in data["selected"].as_array().cloned().unwrap_or_default() {
            let idx = sel["index"].as_i64().unwrap_or(-1);
            let Ok(idx) = usize::try_from(idx) else {
                debug!(index = idx, "curation selected a negative index, dropping");
                continue;
            };
            let Some((work, phase)) = pool.get(idx) else {
                debug!(index = idx, pool = pool.len(), "curation selected an out-of-range index, dropping");
                continue;
            };
            curated.push(CuratedReference {
                work: work.clone(),
                category: sel["category"].as_str().unwrap_or("").to_string(),
                tier: sel["tier"].as_u64().unwrap_or(3).clamp(1, 3) as u8,
                usage_note: sel["usage"].as_str().unwrap_or("").to_string(),
                source_phase: *phase,
            });
        }

        let gaps: Vec<String> = data["gaps"]
            .as_array()
            .map(|g| g.iter().filter_map(|v| v.as_str()).map(String::from).collect())
            .unwrap_or_default();

        (curated, gaps)
    }

    // ── Phase 5: Persist ──────────────────────────────────────────────────────

    /// Hand each curated entry to the store; an already-known identifier
    /// reuses the stored identity. Individual failures are logged and
    /// skipped.
    async fn persist_results(&self, curated: &[CuratedReference]) {
        for reference in curated {
            let existing = match &reference.work.normalized_doi() {
                Some(doi) => match self.store.find_by_doi(doi).await {
                    Ok(found) => found,
                    Err(e) => {
                        warn!(title = reference.work.title.as_str(), error = %e, "store lookup failed, skipping");
                        continue;
                    }
                },
                None => None,
            };

            match existing {
                Some(id) => {
                    debug!(%id, title = reference.work.title.as_str(), "reference already stored");
                }
                None => {
                    if let Err(e) = self.store.insert(&reference.work).await {
                        warn!(title = reference.work.title.as_str(), error = %e, "failed to persist reference");
                    }
                }
            }
        }
    }
}

/// Curation fallback: every verified record becomes a tier-2 selection under
/// its originating blueprint category.
fn fallback_selection(verified: &[VerifiedReference]) -> Vec<CuratedReference> {
    verified
        .iter()
        .filter_map(|v| {
            let work = v.work.as_ref()?;
            Some(CuratedReference {
                work: work.clone(),
                category: v.category.clone(),
                tier: 2,
                usage_note: String::new(),
                source_phase: SourcePhase::Blueprint,
            })
        })
        .collect()
}
