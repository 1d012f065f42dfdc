//! Fuzzy matching and identifier normalization.
//!
//! The same word-set similarity drives three decisions at different
//! thresholds: verification accepts a candidate at >= 0.5, open-access
//! title matching at >= 0.8, and loose grounding checks at >= 0.3.
//! Thresholds live at the call sites; this module is pure computation.

use std::collections::HashSet;

/// Word-level Jaccard similarity between two strings.
///
/// Case-folded, whitespace-tokenized. Returns 0.0 when either input has no
/// words. Symmetric, and 1.0 for any non-empty string against itself.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let wa: HashSet<String> = a.split_whitespace().map(|w| w.to_lowercase()).collect();
    let wb: HashSet<String> = b.split_whitespace().map(|w| w.to_lowercase()).collect();
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let intersection = wa.intersection(&wb).count();
    let union = wa.union(&wb).count();
    intersection as f64 / union as f64
}

/// Normalize a title for comparison: lowercase, strip punctuation,
/// collapse runs of whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a DOI to its canonical lowercase, scheme-stripped form.
///
/// `https://doi.org/10.1000/X` and `doi:10.1000/x` both become `10.1000/x`.
/// Returns `None` for an empty input.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let mut d = doi.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "doi.org/", "doi:"] {
        if let Some(rest) = d.strip_prefix(prefix) {
            d = rest.to_string();
            break;
        }
    }
    if d.is_empty() { None } else { Some(d) }
}
