//! Canonical work record shared by all source adapters.

use refgraph_common::matching::normalize_doi;
use serde::{Deserialize, Serialize};

/// One scholarly work as seen across sources.
///
/// Each adapter maps its service's wire shape into this record; downstream
/// dedup keys on the normalized DOI. Records without a DOI are never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkMetadata {
    pub title: String,
    /// Author display names in publication order.
    pub authors: Vec<String>,
    /// Publication year; 0 = unknown.
    pub year: i32,
    pub venue: Option<String>,
    pub doi: Option<String>,
    /// Source-native id (e.g. an OpenAlex `W…` id or an S2 paper id).
    pub source_id: Option<String>,
    /// arXiv id, when the work is known to be a preprint.
    pub preprint_id: Option<String>,
    pub pmid: Option<String>,
    pub cited_by_count: u32,
    pub full_text_url: Option<String>,
}

impl WorkMetadata {
    /// Lowercased, scheme-stripped DOI, the dedup identity.
    pub fn normalized_doi(&self) -> Option<String> {
        self.doi.as_deref().and_then(normalize_doi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_doi() {
        let work = WorkMetadata {
            doi: Some("https://doi.org/10.1000/ABC".to_string()),
            ..Default::default()
        };
        assert_eq!(work.normalized_doi().as_deref(), Some("10.1000/abc"));

        let no_doi = WorkMetadata::default();
        assert_eq!(no_doi.normalized_doi(), None);
    }
}
