//! refgraph-common — Shared error type and text utilities used across all refgraph crates.

pub mod error;
pub mod logging;
pub mod matching;

pub use error::{RefgraphError, Result};
