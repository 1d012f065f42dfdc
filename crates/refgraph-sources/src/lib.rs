//! refgraph-sources — Outbound clients for bibliographic and open-access services.
//!
//! `client` wraps every outbound request in a named, concurrency-capped,
//! retrying HTTP client. `sources` maps each service's wire shape into the
//! canonical [`models::WorkMetadata`] record. `oa` resolves full-text
//! locations through a fixed-priority strategy chain.

pub mod client;
pub mod models;
pub mod oa;
pub mod sources;

pub use client::SourceClient;
pub use models::WorkMetadata;
pub use sources::BibliographicSource;
