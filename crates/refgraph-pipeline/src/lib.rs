//! refgraph-pipeline — The 5-phase smart reference pipeline.
//!
//! Orchestrates the full flow for one bibliography-building run:
//!   1. Blueprint — the LLM proposes categories, works, authors, venues
//!   2. Verify    — each suggestion is checked against real sources
//!   3. Expand    — verified seeds grow the pool through the citation graph
//!   4. Curate    — the LLM selects and annotates a target-sized subset
//!   5. Persist   — curated entries are handed to the reference store

pub mod blueprint;
pub mod chain;
pub mod config;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod setup;
pub mod store;

pub use chain::{CitationChainMiner, ExpansionSeeds, SeedWork};
pub use pipeline::{
    CuratedReference, ReferenceRequest, SmartReferencePipeline, SmartSearchReport,
    VerifiedReference,
};
pub use pool::{Candidate, CandidatePool, DedupIndex, SourcePhase};
pub use progress::{BroadcastProgress, NoopProgress, ProgressSink};
pub use store::{MemoryStore, ReferenceStore};
