//! Bibliography blueprint: the generative suggestion step.
//!
//! The LLM proposes named categories, each carrying suggested works, search
//! queries, key authors, and key venues. The output is advisory and possibly
//! wrong: every suggested work must survive verification before it counts.
//! Malformed output degrades to an empty blueprint, never an error.

use refgraph_llm::extract_json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A work proposed by the blueprint, before verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestedWork {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlueprintCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggested_refs: Vec<SuggestedWork>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub key_authors: Vec<String>,
    #[serde(default)]
    pub key_venues: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub categories: Vec<BlueprintCategory>,
}

impl Blueprint {
    /// Parse an LLM response. Anything unparsable yields an empty blueprint.
    pub fn parse(text: &str) -> Self {
        let value = match extract_json(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "blueprint response not valid JSON, returning empty");
                return Self::default();
            }
        };
        match serde_json::from_value::<Blueprint>(value) {
            Ok(blueprint) => {
                info!(
                    categories = blueprint.categories.len(),
                    suggestions = blueprint.total_suggested(),
                    "blueprint parsed"
                );
                blueprint
            }
            Err(e) => {
                warn!(error = %e, "blueprint JSON has unexpected shape, returning empty");
                Self::default()
            }
        }
    }

    pub fn total_suggested(&self) -> usize {
        self.categories.iter().map(|c| c.suggested_refs.len()).sum()
    }

    /// Key authors across all categories, case-insensitively deduplicated,
    /// first-seen order.
    pub fn all_key_authors(&self) -> Vec<String> {
        dedup_case_insensitive(self.categories.iter().flat_map(|c| c.key_authors.iter()))
    }

    pub fn all_key_venues(&self) -> Vec<String> {
        dedup_case_insensitive(self.categories.iter().flat_map(|c| c.key_venues.iter()))
    }
}

fn dedup_case_insensitive<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for item in items {
        if seen.insert(item.to_lowercase()) {
            result.push(item.clone());
        }
    }
    result
}

// ── Prompts ───────────────────────────────────────────────────────────────────

pub fn blueprint_prompt(topic_title: &str, research_question: &str, gap_description: &str) -> String {
    format!(
        r#"You are planning the bibliography for an academic manuscript.

Manuscript title: {topic_title}
Research question: {research_question}
Identified gap: {gap_description}

Propose a bibliography blueprint: 3-6 named categories the reference list
should cover. For each category, list canonical works you believe exist,
search queries that would surface more, and the key authors and venues of
that subfield.

Respond with JSON only, in exactly this shape:
{{
  "categories": [
    {{
      "name": "category name",
      "description": "one sentence on what this category covers",
      "suggested_refs": [
        {{"title": "exact work title", "author": "first author surname", "year": 2020}}
      ],
      "search_queries": ["query one", "query two"],
      "key_authors": ["Full Name"],
      "key_venues": ["Venue Name"]
    }}
  ]
}}"#
    )
}

pub fn curation_prompt(
    topic_title: &str,
    research_question: &str,
    target_count: usize,
    categories_description: &str,
    candidate_count: usize,
    candidates_text: &str,
) -> String {
    format!(
        r#"You are curating the final reference list for an academic manuscript.

Manuscript title: {topic_title}
Research question: {research_question}

Categories:
{categories_description}

Below are {candidate_count} candidate references, one per line, each prefixed
with its index. Select the {target_count} most valuable for this manuscript.

{candidates_text}

Respond with JSON only, in exactly this shape:
{{
  "selected": [
    {{"index": 0, "category": "category name", "tier": 1, "usage": "where and why this reference is used"}}
  ],
  "gaps": ["a kind of reference the pool is still missing"]
}}

Tier is 1 (essential), 2 (important), or 3 (optional). Only use indices
that appear in the list."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"```json
{
  "categories": [
    {
      "name": "Foundations",
      "description": "Core theory",
      "suggested_refs": [
        {"title": "Work Alpha", "author": "Smith", "year": 2019},
        {"title": "Work Beta", "author": "Jones", "year": 2021}
      ],
      "key_authors": ["Ada Smith", "ada smith", "Bo Jones"],
      "key_venues": ["Nature"]
    },
    {
      "name": "Methods",
      "suggested_refs": [{"title": "Work Gamma"}],
      "key_authors": ["Bo Jones"],
      "key_venues": ["nature", "Science"]
    }
  ]
}
```"#;

    #[test]
    fn test_parse_valid_blueprint() {
        let bp = Blueprint::parse(VALID);
        assert_eq!(bp.categories.len(), 2);
        assert_eq!(bp.total_suggested(), 3);
        assert_eq!(bp.categories[0].suggested_refs[0].author, "Smith");
        // Missing fields default
        assert_eq!(bp.categories[1].suggested_refs[0].year, 0);
    }

    #[test]
    fn test_key_authors_dedup_case_insensitive() {
        let bp = Blueprint::parse(VALID);
        assert_eq!(bp.all_key_authors(), vec!["Ada Smith", "Bo Jones"]);
        assert_eq!(bp.all_key_venues(), vec!["Nature", "Science"]);
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        let bp = Blueprint::parse("I could not produce JSON, sorry.");
        assert!(bp.categories.is_empty());
        assert_eq!(bp.total_suggested(), 0);
    }

    #[test]
    fn test_parse_wrong_shape_is_empty() {
        let bp = Blueprint::parse(r#"{"categories": "not an array"}"#);
        assert!(bp.categories.is_empty());
    }

    #[test]
    fn test_prompts_carry_inputs() {
        let p = blueprint_prompt("Topic T", "Question Q", "Gap G");
        assert!(p.contains("Topic T") && p.contains("Question Q") && p.contains("Gap G"));

        let c = curation_prompt("Topic T", "Question Q", 10, "- cats", 3, "0. x");
        assert!(c.contains("Select the 10 most valuable"));
        assert!(c.contains("3 candidate references"));
    }
}
