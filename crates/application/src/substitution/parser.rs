//! Placeholder parser for `{{name}}` syntax
//!
//! Scans strings for placeholders and reports their names and positions.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("valid regex"));

/// A placeholder found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The name between the braces.
    pub name: String,

    /// Byte range of the whole `{{name}}` span in the original string.
    pub span: Range<usize>,
}

/// Finds every non-overlapping placeholder, left to right.
///
/// # Examples
///
/// ```
/// use hostvar_application::substitution::find_placeholders;
///
/// let found = find_placeholders("{{HOST}}/api/{{VERSION}}");
/// assert_eq!(found.len(), 2);
/// assert_eq!(found[0].name, "HOST");
/// assert_eq!(found[1].span, 13..24);
/// ```
#[must_use]
pub fn find_placeholders(input: &str) -> Vec<Placeholder> {
    PLACEHOLDER_PATTERN
        .captures_iter(input)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Placeholder {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Returns true if the input contains at least one well-formed placeholder.
#[must_use]
pub fn has_placeholders(input: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(input)
}

/// Returns the placeholder names in order of appearance, duplicates included.
#[must_use]
pub fn placeholder_names(input: &str) -> Vec<String> {
    find_placeholders(input)
        .into_iter()
        .map(|p| p.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_placeholder() {
        let found = find_placeholders("{{name}}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "name");
        assert_eq!(found[0].span, 0..8);
    }

    #[test]
    fn test_parse_multiple_placeholders() {
        let names = placeholder_names("{{base_url}}/api/{{version}}/users/{{ID}}");
        assert_eq!(names, vec!["base_url", "version", "ID"]);
    }

    #[test]
    fn test_whitespace_is_not_part_of_the_grammar() {
        assert!(find_placeholders("{{ name }}").is_empty());
    }

    #[test]
    fn test_invalid_characters_are_ignored() {
        assert!(find_placeholders("{{my-var}}").is_empty());
        assert!(find_placeholders("{{$uuid}}").is_empty());
        assert!(find_placeholders("{{}}").is_empty());
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(find_placeholders("{{name").is_empty());
        assert!(find_placeholders("name}}").is_empty());
        assert!(find_placeholders("{name}").is_empty());
    }

    #[test]
    fn test_adjacent_placeholders() {
        assert_eq!(placeholder_names("{{a}}{{b}}{{c}}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nested_braces_match_innermost_valid_span() {
        let input = "{{{{x}}}}";
        let found = find_placeholders(input);
        assert_eq!(found.len(), 1);
        assert_eq!(&input[found[0].span.clone()], "{{x}}");
    }

    #[test]
    fn test_placeholder_in_json() {
        let names = placeholder_names(r#"{"token": "{{API_TOKEN}}", "id": {{USER_ID}}}"#);
        assert_eq!(names, vec!["API_TOKEN", "USER_ID"]);
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("Hello {{name}}!"));
        assert!(!has_placeholders("Hello World!"));
        assert!(!has_placeholders("{{incomplete"));
        assert!(!has_placeholders("{{ spaced }}"));
    }

    #[test]
    fn test_span_positions_are_byte_offsets() {
        let input = "Olá {{name}}, bem-vindo!";
        let found = find_placeholders(input);
        assert_eq!(&input[found[0].span.clone()], "{{name}}");
    }
}
