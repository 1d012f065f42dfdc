//! JSON extraction from generative output.
//!
//! Models often wrap JSON in markdown code fences (with or without a
//! language tag); strip them before parsing. Callers decide how to degrade
//! when parsing still fails.

/// Strip surrounding markdown fences and parse the remainder as JSON.
pub fn extract_json(text: &str) -> Result<serde_json::Value, serde_json::Error> {
    let mut t = text.trim();

    if t.starts_with("```") {
        // Drop the opening fence line (```json or bare ```).
        t = match t.find('\n') {
            Some(idx) => &t[idx + 1..],
            None => &t[3..],
        };
    }
    if let Some(stripped) = t.trim_end().strip_suffix("```") {
        t = stripped;
    }

    serde_json::from_str(t.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_json() {
        let v = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_fenced_with_language_tag() {
        let v = extract_json("```json\n{\"a\": [1, 2]}\n```").unwrap();
        assert_eq!(v["a"][1], 2);
    }

    #[test]
    fn test_fenced_without_language_tag() {
        let v = extract_json("```\n{\"ok\": true}\n```").unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn test_surrounding_whitespace() {
        let v = extract_json("  \n```json\n{\"x\": \"y\"}\n```  \n").unwrap();
        assert_eq!(v["x"], "y");
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(extract_json("here are the references you asked for").is_err());
        assert!(extract_json("```json\nnot json\n```").is_err());
    }
}
