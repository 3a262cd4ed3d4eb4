//! Directive parser
//!
//! Turns the header into an ordered, duplicate-preserving list of directives.
//! Only lines of the shape `// @<key><ws><value>` are directives; everything
//! else inside the header is left to the rewriter untouched.

use super::{lines_with_offsets, locate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::ops::Range;

static DIRECTIVE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^// @(\S+)(?:(\s+)(.*))?$").expect("directive regex is valid"));

/// One `@key value` line of the header
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub key: String,
    pub value: String,
    pub original_line: String,
    /// Absolute byte range of the line content (terminator excluded)
    #[serde(skip)]
    pub line: Range<usize>,
    /// Absolute offset of the next line (terminator included)
    #[serde(skip)]
    pub next_line: usize,
    /// Absolute byte range of the value; empty at line end for key-only lines
    #[serde(skip)]
    pub value_range: Range<usize>,
    /// Whether whitespace separates the key from the value
    #[serde(skip)]
    pub has_separator: bool,
}

/// Parse every directive of the header in textual order.
///
/// Returns an empty list when `source` has no header.
pub fn parse_directives(source: &str) -> Vec<Directive> {
    let Some(span) = locate(source) else {
        return Vec::new();
    };
    let closing_start = span.closing_line_start();

    lines_with_offsets(source)
        .filter(|line| line.start > span.start && line.start < closing_start)
        .filter_map(|line| {
            let caps = DIRECTIVE_LINE.captures(line.content)?;
            let key = caps.get(1)?;
            let (value_range, has_separator) = match caps.get(3) {
                Some(value) => (
                    line.start + value.start()..line.start + value.end(),
                    true,
                ),
                None => (line.content_end()..line.content_end(), false),
            };
            Some(Directive {
                key: key.as_str().to_string(),
                value: source[value_range.clone()].to_string(),
                original_line: line.content.to_string(),
                line: line.start..line.content_end(),
                next_line: line.next,
                value_range,
                has_separator,
            })
        })
        .collect()
}

/// Parse the header into a key -> values view.
pub fn parse_meta(source: &str) -> ParsedMeta {
    ParsedMeta::from_directives(&parse_directives(source))
}

/// Ordered key -> values view over the directives
///
/// Keys keep first-seen order and every key keeps all of its values in
/// appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMeta {
    entries: Vec<(String, Vec<String>)>,
}

impl ParsedMeta {
    pub fn from_directives(directives: &[Directive]) -> Self {
        let mut meta = Self::default();
        for directive in directives {
            match meta.entries.iter_mut().find(|(key, _)| *key == directive.key) {
                Some((_, values)) => values.push(directive.value.clone()),
                None => meta
                    .entries
                    .push((directive.key.clone(), vec![directive.value.clone()])),
            }
        }
        meta
    }

    /// All values for `key`, in appearance order
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value for `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// First non-blank value for `key`; blank directives count as absent
    pub fn first_non_empty(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .iter()
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ParsedMeta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_meta() {
        let js = "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// ==/UserScript==\nvar foo = \"bar\";\n";
        let meta = parse_meta(js);

        assert_eq!(meta.get_all("name"), ["A Test!".to_string()]);
        assert_eq!(meta.get_all("description"), ["Unit test.".to_string()]);
        assert_eq!(meta.keys().collect::<Vec<_>>(), ["name", "description"]);
    }

    #[test]
    fn test_parse_meta_without_header() {
        assert!(parse_meta("var foo = \"bar\";\n").is_empty());
        assert!(parse_directives("var foo = \"bar\";\n").is_empty());
    }

    #[test]
    fn test_repeated_keys_are_preserved() {
        let js = "// ==UserScript==\n// @require a.js\n// @name x\n// @require b.js\n// ==/UserScript==\n";
        let directives = parse_directives(js);
        let meta = ParsedMeta::from_directives(&directives);

        assert_eq!(directives.len(), 3);
        assert_eq!(meta.get_all("require"), ["a.js".to_string(), "b.js".to_string()]);
        assert_eq!(meta.first("require"), Some("a.js"));
        assert_eq!(meta.keys().collect::<Vec<_>>(), ["require", "name"]);
    }

    #[test]
    fn test_non_directive_lines_are_skipped() {
        let js = "// ==UserScript==\n\n// just a comment\n//@name tight\n// @name spaced\n// ==/UserScript==\n";
        let directives = parse_directives(js);

        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].value, "spaced");
    }

    #[test]
    fn test_value_keeps_trailing_whitespace_and_inner_spacing() {
        let js = "// ==UserScript==\n// @name   two  words  \n// ==/UserScript==\n";
        let directive = &parse_directives(js)[0];

        assert_eq!(directive.key, "name");
        assert_eq!(directive.value, "two  words  ");
        assert_eq!(directive.original_line, "// @name   two  words  ");
    }

    #[test]
    fn test_key_only_directive() {
        let js = "// ==UserScript==\n// @noframes\n// ==/UserScript==\n";
        let directive = &parse_directives(js)[0];

        assert_eq!(directive.key, "noframes");
        assert_eq!(directive.value, "");
        assert!(!directive.has_separator);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let js = "// ==UserScript==\n// @updateURL a\n// @updateUrl b\n// ==/UserScript==\n";
        let meta = parse_meta(js);

        assert_eq!(meta.first("updateURL"), Some("a"));
        assert_eq!(meta.first("updateUrl"), Some("b"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_crlf_values_exclude_carriage_return() {
        let js = "// ==UserScript==\r\n// @version 1.1\r\n// ==/UserScript==\r\n";
        assert_eq!(parse_meta(js).first("version"), Some("1.1"));
    }

    #[test]
    fn test_first_non_empty_skips_blank_values() {
        let js = "// ==UserScript==\n// @version\n// @version   \n// @version 2\n// ==/UserScript==\n";
        let meta = parse_meta(js);

        assert_eq!(meta.first("version"), Some(""));
        assert_eq!(meta.first_non_empty("version"), Some("2"));
        assert_eq!(meta.first_non_empty("name"), None);
    }

    #[test]
    fn test_parsed_meta_serializes_as_ordered_map() {
        let js = "// ==UserScript==\n// @name x\n// @grant a\n// @grant b\n// ==/UserScript==\n";
        let json = serde_json::to_string(&parse_meta(js)).unwrap();
        assert_eq!(json, r#"{"name":["x"],"grant":["a","b"]}"#);
    }
}
