//! JSON object extraction from free-form model output
//!
//! Models often wrap the requested object in prose or markdown fences. The
//! extractor returns the first balanced `{...}` span. Braces inside string
//! literals are ignored, so `{"note": "use {x}"}` is returned whole.

/// Returns the first balanced top-level JSON object in `text`, if any.
///
/// String and escape state is only tracked inside an object, so stray quotes
/// in surrounding prose cannot hide the object. Unmatched closing braces
/// before the first object are skipped.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            '"' if depth > 0 => in_string = true,
            _ => {}
        }
    }

    None
}

/// Text to parse as the candidate plan: the first object, or the trimmed input.
pub fn candidate_text(text: &str) -> &str {
    extract_first_json_object(text).unwrap_or_else(|| text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_nested_object_from_noise() {
        let text = r#"noise { "a":1, "b": {"c":2} } trailing"#;
        assert_eq!(
            extract_first_json_object(text),
            Some(r#"{ "a":1, "b": {"c":2} }"#)
        );
    }

    #[test]
    fn test_braces_inside_strings_do_not_count() {
        let text = r#"Here: {"filter": {"name": "a}b"}, "note": "{"} done"#;
        assert_eq!(
            extract_first_json_object(text),
            Some(r#"{"filter": {"name": "a}b"}, "note": "{"}"#)
        );
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"{"q": "say \"}\" loudly"} tail"#;
        assert_eq!(
            extract_first_json_object(text),
            Some(r#"{"q": "say \"}\" loudly"}"#)
        );
    }

    #[test]
    fn test_markdown_fence() {
        let text = "```json\n{\"action\":\"count\",\"collection\":\"o\"}\n```";
        assert_eq!(
            extract_first_json_object(text),
            Some("{\"action\":\"count\",\"collection\":\"o\"}")
        );
    }

    #[test]
    fn test_no_object_falls_back_to_trimmed_text() {
        assert_eq!(extract_first_json_object("  no json here "), None);
        assert_eq!(candidate_text("  no json here "), "no json here");
    }

    #[test]
    fn test_unbalanced_object_is_not_returned() {
        assert_eq!(extract_first_json_object(r#"{"a": {"b": 1}"#), None);
    }

    #[test]
    fn test_stray_closing_brace_before_object() {
        assert_eq!(extract_first_json_object("} {\"a\":1}"), Some("{\"a\":1}"));
    }
}
