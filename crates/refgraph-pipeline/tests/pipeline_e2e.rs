//! End-to-end pipeline run against mocked collaborators.
//!
//! Exercises the full five-phase flow offline: a scripted LLM produces the
//! blueprint and curation output, stub sources answer verification and
//! citation-graph calls, and an in-memory store receives the result.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use refgraph_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use refgraph_pipeline::{
    MemoryStore, ProgressSink, ReferenceRequest, ReferenceStore, SmartReferencePipeline,
    SourcePhase,
};
use refgraph_sources::{BibliographicSource, WorkMetadata};

// ── Mock collaborators ───────────────────────────────────────────────────────

/// Replays a fixed queue of responses; an empty queue means the backend is down.
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(content) => Ok(LlmResponse {
                content,
                model: "scripted".to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }),
            None => Err(LlmError::Unavailable("script exhausted".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
    fn is_local(&self) -> bool {
        true
    }
}

fn work(title: &str, doi: &str, source_id: &str) -> WorkMetadata {
    WorkMetadata {
        title: title.to_string(),
        authors: vec!["Mock Author".to_string()],
        year: 2020,
        doi: Some(doi.to_string()),
        source_id: Some(source_id.to_string()),
        ..Default::default()
    }
}

/// Primary verification source: knows Alpha and Beta, has never heard of Gamma.
struct PrimaryStub;

#[async_trait]
impl BibliographicSource for PrimaryStub {
    fn name(&self) -> &'static str {
        "crossref"
    }

    async fn search_works(&self, query: &str, _limit: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        if query.contains("Work Alpha") {
            Ok(vec![work("Work Alpha", "10.1/alpha", "W-alpha")])
        } else if query.contains("Work Beta") {
            Ok(vec![work("Work Beta", "10.1/beta", "W-beta")])
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_work_by_id(&self, _id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        Ok(None)
    }
    async fn get_referenced_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn get_citing_works(
        &self,
        _id: &str,
        _l: usize,
        _s: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn search_author(&self, _name: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn get_author_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn search_in_venue(
        &self,
        _q: &str,
        _v: &str,
        _l: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
}

/// Graph source: verification misses everything; backward expansion fans out
/// five fresh works plus one duplicate of a seed DOI (which must be dropped).
struct GraphStub;

#[async_trait]
impl BibliographicSource for GraphStub {
    fn name(&self) -> &'static str {
        "openalex"
    }

    async fn search_works(&self, _query: &str, _limit: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn get_work_by_id(&self, _id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        Ok(None)
    }

    async fn get_referenced_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(vec![
            work("Expanded One", "10.9/1", "W-e1"),
            work("Expanded Two", "10.9/2", "W-e2"),
            work("Expanded Three", "10.9/3", "W-e3"),
            work("Expanded Four", "10.9/4", "W-e4"),
            work("Expanded Five", "10.9/5", "W-e5"),
            // Same DOI as a seed; the miner must not re-add it.
            work("Work Alpha (again)", "10.1/alpha", "W-alpha"),
        ])
    }

    async fn get_citing_works(
        &self,
        _id: &str,
        _l: usize,
        _s: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn search_author(&self, _name: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn get_author_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
    async fn search_in_venue(
        &self,
        _q: &str,
        _v: &str,
        _l: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        Ok(Vec::new())
    }
}

/// Every operation fails: the worst-case world of an unreachable internet.
struct DownSource;

#[async_trait]
impl BibliographicSource for DownSource {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn search_works(&self, _q: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
    async fn get_work_by_id(&self, _id: &str) -> anyhow::Result<Option<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
    async fn get_referenced_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
    async fn get_citing_works(
        &self,
        _id: &str,
        _l: usize,
        _s: bool,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
    async fn search_author(&self, _name: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("connection refused")
    }
    async fn get_author_works(&self, _id: &str, _l: usize) -> anyhow::Result<Vec<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
    async fn search_in_venue(
        &self,
        _q: &str,
        _v: &str,
        _l: usize,
    ) -> anyhow::Result<Vec<WorkMetadata>> {
        anyhow::bail!("connection refused")
    }
}

/// Records every report for later inspection.
#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<(f64, String)>>,
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn report(&self, fraction: f64, message: &str) {
        self.events.lock().unwrap().push((fraction, message.to_string()));
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

const BLUEPRINT_RESPONSE: &str = r#"```json
{
  "categories": [
    {
      "name": "Foundations",
      "description": "Core theory",
      "suggested_refs": [
        {"title": "Work Alpha", "author": "Smith", "year": 2019},
        {"title": "Work Beta", "author": "Jones", "year": 2021}
      ],
      "key_authors": ["Ada Smith"],
      "key_venues": ["Nature"]
    },
    {
      "name": "Methods",
      "description": "How it is measured",
      "suggested_refs": [
        {"title": "Work Gamma", "author": "Wu", "year": 2022}
      ]
    }
  ]
}
```"#;

const CURATION_RESPONSE: &str = r#"{
  "selected": [
    {"index": 0, "category": "Foundations", "tier": 1, "usage": "framing"},
    {"index": 2, "category": "Methods", "tier": 2, "usage": "protocol"},
    {"index": 4, "category": "Methods", "tier": 3, "usage": ""},
    {"index": 99, "category": "Methods", "tier": 1, "usage": "ghost"}
  ],
  "gaps": ["no recent surveys"]
}"#;

fn request() -> ReferenceRequest {
    ReferenceRequest {
        topic_title: "Topic Title".to_string(),
        research_question: "Does it work?".to_string(),
        gap_description: "Nobody has measured it".to_string(),
        target_count: 10,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_with_expansion_and_curation() {
    let llm = Arc::new(ScriptedLlm::new(&[BLUEPRINT_RESPONSE, CURATION_RESPONSE]));
    let store = Arc::new(MemoryStore::new());
    let pipeline = SmartReferencePipeline::new(
        Arc::new(PrimaryStub),
        Arc::new(GraphStub),
        llm,
        store.clone(),
    );

    let progress = RecordingProgress::default();
    let report = pipeline.run(&request(), &progress).await.unwrap();

    // Blueprint proposed 3 works across 2 categories; Alpha and Beta verify
    // against the primary source, Gamma misses both sources.
    assert_eq!(report.blueprint_suggested, 3);
    assert_eq!(report.verified, 2);
    assert_eq!(report.hallucinated, 1);

    // Expansion yields 5 fresh candidates; the seed-DOI duplicate is dropped.
    assert_eq!(report.expanded_pool, 5);

    // Curation picked indices 0, 2, 4; index 99 was silently ignored.
    assert_eq!(report.final_selected, 3);
    assert_eq!(report.references.len(), 3);
    assert_eq!(report.references[0].source_phase, SourcePhase::Blueprint);
    assert_eq!(report.references[1].source_phase, SourcePhase::CitationChain);
    assert_eq!(report.gaps, vec!["no recent surveys".to_string()]);

    assert_eq!(report.categories.get("Foundations"), Some(&1));
    assert_eq!(report.categories.get("Methods"), Some(&2));
    assert_eq!(report.tier_counts.get(&1), Some(&1));
    assert_eq!(report.tier_counts.get(&2), Some(&1));
    assert_eq!(report.tier_counts.get(&3), Some(&1));

    // All three curated references reached the store.
    assert_eq!(store.len().await, 3);

    // Progress is monotone and finishes at exactly 1.0.
    let events = progress.events.lock().unwrap();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(events.last().unwrap().0, 1.0);
}

#[tokio::test]
async fn test_unparsable_curation_falls_back_to_verified() {
    let llm = Arc::new(ScriptedLlm::new(&[
        BLUEPRINT_RESPONSE,
        "I would rather write prose than JSON.",
    ]));
    let store = Arc::new(MemoryStore::new());
    let pipeline = SmartReferencePipeline::new(
        Arc::new(PrimaryStub),
        Arc::new(GraphStub),
        llm,
        store.clone(),
    );

    let report = pipeline
        .run(&request(), &RecordingProgress::default())
        .await
        .unwrap();

    // Exactly the verified set, each at tier 2, under its blueprint category.
    assert_eq!(report.final_selected, 2);
    assert!(report.references.iter().all(|r| r.tier == 2));
    let categories: Vec<&str> = report.references.iter().map(|r| r.category.as_str()).collect();
    assert!(categories.contains(&"Foundations"));
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_everything_down_still_produces_report() {
    // No scripted responses: the LLM fails both calls; both sources refuse
    // every request. The run must still complete with a zeroed report.
    let llm = Arc::new(ScriptedLlm::new(&[]));
    let store = Arc::new(MemoryStore::new());
    let pipeline = SmartReferencePipeline::new(
        Arc::new(DownSource),
        Arc::new(DownSource),
        llm,
        store.clone(),
    );

    let progress = RecordingProgress::default();
    let report = pipeline.run(&request(), &progress).await.unwrap();

    assert_eq!(report.blueprint_suggested, 0);
    assert_eq!(report.verified, 0);
    assert_eq!(report.hallucinated, 0);
    assert_eq!(report.expanded_pool, 0);
    assert_eq!(report.final_selected, 0);
    assert!(store.is_empty().await);

    let events = progress.events.lock().unwrap();
    assert_eq!(events.last().unwrap().0, 1.0);
}

#[tokio::test]
async fn test_empty_topic_is_the_only_run_level_error() {
    let llm = Arc::new(ScriptedLlm::new(&[]));
    let pipeline = SmartReferencePipeline::new(
        Arc::new(PrimaryStub),
        Arc::new(GraphStub),
        llm,
        Arc::new(MemoryStore::new()),
    );

    let mut bad = request();
    bad.topic_title = "   ".to_string();
    assert!(pipeline.run(&bad, &RecordingProgress::default()).await.is_err());
}

#[tokio::test]
async fn test_persist_reuses_existing_identity() {
    let store = Arc::new(MemoryStore::new());
    // Both verifiable works are already known to the store.
    store.insert(&work("Work Alpha", "10.1/alpha", "W-alpha")).await.unwrap();
    store.insert(&work("Work Beta", "10.1/beta", "W-beta")).await.unwrap();

    let llm = Arc::new(ScriptedLlm::new(&[BLUEPRINT_RESPONSE, CURATION_RESPONSE]));
    let pipeline = SmartReferencePipeline::new(
        Arc::new(PrimaryStub),
        Arc::new(GraphStub),
        llm,
        store.clone(),
    );

    let report = pipeline
        .run(&request(), &RecordingProgress::default())
        .await
        .unwrap();

    // Three selected: the verified one reuses its stored identity, only the
    // two expanded works are created. 2 pre-existing + 2 new.
    assert_eq!(report.final_selected, 3);
    assert_eq!(store.len().await, 4);
}
