//! arXiv URL construction: pure string templating, no network call.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use crate::models::WorkMetadata;

use super::OaStrategy;

fn doi_arxiv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)arxiv\.(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid regex"))
}

fn url_arxiv_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid regex")
    })
}

/// arXiv id from the record itself: the preprint id field, a
/// `10.48550/arXiv.*` DOI, or an arxiv.org full-text URL.
pub fn extract_arxiv_id(work: &WorkMetadata) -> Option<String> {
    if let Some(id) = &work.preprint_id {
        if !id.is_empty() {
            return Some(id.clone());
        }
    }

    if let Some(doi) = &work.doi {
        if let Some(caps) = doi_arxiv_re().captures(doi) {
            return Some(caps[1].to_string());
        }
    }

    if let Some(url) = &work.full_text_url {
        if url.contains("arxiv.org") {
            if let Some(caps) = url_arxiv_re().captures(url) {
                return Some(caps[1].to_string());
            }
        }
    }

    None
}

pub struct PreprintStrategy;

#[async_trait]
impl OaStrategy for PreprintStrategy {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn resolve(&self, work: &WorkMetadata) -> Option<String> {
        extract_arxiv_id(work).map(|id| format!("https://arxiv.org/pdf/{id}.pdf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_preprint_field() {
        let work = WorkMetadata {
            preprint_id: Some("2301.12345".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_arxiv_id(&work).as_deref(), Some("2301.12345"));
    }

    #[test]
    fn test_id_from_doi() {
        let work = WorkMetadata {
            doi: Some("10.48550/arXiv.2301.12345".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_arxiv_id(&work).as_deref(), Some("2301.12345"));
    }

    #[test]
    fn test_id_from_url_with_version() {
        let work = WorkMetadata {
            full_text_url: Some("https://arxiv.org/abs/1706.03762v5".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_arxiv_id(&work).as_deref(), Some("1706.03762v5"));
    }

    #[test]
    fn test_no_id_anywhere() {
        let work = WorkMetadata {
            doi: Some("10.1038/nature12373".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_arxiv_id(&work), None);
    }

    #[tokio::test]
    async fn test_resolve_builds_pdf_url() {
        let work = WorkMetadata {
            preprint_id: Some("1706.03762".to_string()),
            ..Default::default()
        };
        let url = PreprintStrategy.resolve(&work).await;
        assert_eq!(url.as_deref(), Some("https://arxiv.org/pdf/1706.03762.pdf"));
    }
}
