//! Candidate pool with DOI deduplication and a hard size cap.

use refgraph_common::matching::normalize_doi;
use refgraph_sources::WorkMetadata;
use serde::{Deserialize, Serialize};

/// Which pipeline stage introduced a candidate into the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePhase {
    Blueprint,
    CitationChain,
    AuthorChain,
    VenueSearch,
}

impl SourcePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePhase::Blueprint => "blueprint",
            SourcePhase::CitationChain => "citation_chain",
            SourcePhase::AuthorChain => "author_chain",
            SourcePhase::VenueSearch => "journal_search",
        }
    }
}

/// One pool entry: a work plus its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub work: WorkMetadata,
    pub phase: SourcePhase,
}

/// Tracks which normalized DOIs have been seen.
///
/// `try_insert` is the only mutating operation. A missing or empty DOI
/// always inserts: DOI-less records are never merged with anything.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: std::collections::HashSet<String>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a DOI; returns false iff the normalized DOI was already seen.
    pub fn try_insert(&mut self, doi: Option<&str>) -> bool {
        match doi.and_then(normalize_doi) {
            Some(normalized) => self.seen.insert(normalized),
            None => true,
        }
    }
}

/// Append-only, capped, DOI-deduplicated candidate collection.
///
/// Insertion order is preserved; once `max_total` is reached no further
/// entries are accepted regardless of remaining expansion work.
#[derive(Debug)]
pub struct CandidatePool {
    entries: Vec<Candidate>,
    index: DedupIndex,
    max_total: usize,
}

impl CandidatePool {
    pub fn new(max_total: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: DedupIndex::new(),
            max_total,
        }
    }

    /// Mark a DOI as seen without occupying a pool slot. Used for seed
    /// works so expansion never re-adds its own starting points.
    pub fn mark_seen(&mut self, doi: &str) {
        self.index.try_insert(Some(doi));
    }

    /// Append a candidate unless the pool is full or the DOI is a duplicate.
    pub fn try_push(&mut self, work: WorkMetadata, phase: SourcePhase) -> bool {
        if self.is_full() {
            return false;
        }
        if !self.index.try_insert(work.doi.as_deref()) {
            return false;
        }
        self.entries.push(Candidate { work, phase });
        true
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<Candidate> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(title: &str, doi: Option<&str>) -> WorkMetadata {
        WorkMetadata {
            title: title.to_string(),
            doi: doi.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_doi_rejected() {
        let mut pool = CandidatePool::new(10);
        assert!(pool.try_push(work("a", Some("10.1/x")), SourcePhase::CitationChain));
        // Same DOI in a different representation
        assert!(!pool.try_push(work("a again", Some("https://doi.org/10.1/X")), SourcePhase::AuthorChain));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_doiless_records_never_merged() {
        let mut pool = CandidatePool::new(10);
        assert!(pool.try_push(work("untracked one", None), SourcePhase::CitationChain));
        assert!(pool.try_push(work("untracked two", None), SourcePhase::CitationChain));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_cap_refuses_inserts() {
        let mut pool = CandidatePool::new(2);
        assert!(pool.try_push(work("a", Some("10.1/a")), SourcePhase::CitationChain));
        assert!(pool.try_push(work("b", Some("10.1/b")), SourcePhase::CitationChain));
        assert!(pool.is_full());
        assert!(!pool.try_push(work("c", Some("10.1/c")), SourcePhase::CitationChain));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_mark_seen_blocks_without_slot() {
        let mut pool = CandidatePool::new(10);
        pool.mark_seen("10.1/seed");
        assert!(!pool.try_push(work("the seed", Some("10.1/seed")), SourcePhase::CitationChain));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut pool = CandidatePool::new(10);
        pool.try_push(work("first", Some("10.1/1")), SourcePhase::CitationChain);
        pool.try_push(work("second", None), SourcePhase::AuthorChain);
        pool.try_push(work("third", Some("10.1/3")), SourcePhase::VenueSearch);
        let entries = pool.into_entries();
        let titles: Vec<&str> = entries.iter().map(|c| c.work.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dedup_index_no_doi_always_inserts() {
        let mut index = DedupIndex::new();
        assert!(index.try_insert(None));
        assert!(index.try_insert(None));
        assert!(index.try_insert(Some("")));
        assert!(index.try_insert(Some("10.1/x")));
        assert!(!index.try_insert(Some("doi:10.1/X")));
    }
}
