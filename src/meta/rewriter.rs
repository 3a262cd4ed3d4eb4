//! Meta rewriter
//!
//! Applies directive edits as splices over the original text so that every
//! line not targeted by an edit stays byte-identical.

use super::{locate, parse_directives};
use std::ops::Range;

/// Directive edits applied by [`rewrite`]
///
/// Both maps keep insertion order; setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaEdits {
    replace_or_remove: Vec<(String, Option<String>)>,
    add_if_missing: Vec<(String, String)>,
}

impl MetaEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value of the first `key` directive (never creates a line)
    pub fn replace(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.replace_or_remove(key, Some(value.into()))
    }

    /// Remove every `key` directive
    pub fn remove(self, key: impl Into<String>) -> Self {
        self.replace_or_remove(key, None)
    }

    pub fn replace_or_remove(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        let key = key.into();
        match self.replace_or_remove.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.replace_or_remove.push((key, value)),
        }
        self
    }

    /// Append `// @key value` before the closing marker unless `key` is present
    pub fn add_if_missing(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.add_if_missing.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.add_if_missing.push((key, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.replace_or_remove.is_empty() && self.add_if_missing.is_empty()
    }
}

/// Apply `edits` to the header of `source`.
///
/// Text without a header is returned unchanged.
pub fn rewrite(source: &str, edits: &MetaEdits) -> String {
    let Some(span) = locate(source) else {
        return source.to_string();
    };
    let directives = parse_directives(source);
    let mut splices: Vec<(Range<usize>, String)> = Vec::new();
    let mut removed: Vec<&str> = Vec::new();

    for (key, value) in &edits.replace_or_remove {
        match value {
            None => {
                for directive in directives.iter().filter(|d| d.key == *key) {
                    splices.push((directive.line.start..directive.next_line, String::new()));
                }
                removed.push(key);
            }
            Some(value) => {
                if let Some(directive) = directives.iter().find(|d| d.key == *key) {
                    let replacement = if directive.has_separator {
                        value.clone()
                    } else {
                        format!(" {}", value)
                    };
                    splices.push((directive.value_range.clone(), replacement));
                }
            }
        }
    }

    let terminator = span.line_terminator(source);
    let mut present: Vec<&str> = directives
        .iter()
        .map(|d| d.key.as_str())
        .filter(|key| !removed.contains(key))
        .collect();
    let mut appended = String::new();
    for (key, value) in &edits.add_if_missing {
        if present.contains(&key.as_str()) {
            continue;
        }
        appended.push_str(&format!("// @{} {}{}", key, value, terminator));
        present.push(key);
    }
    if !appended.is_empty() {
        let at = span.closing_line_start();
        splices.push((at..at, appended));
    }

    apply_splices(source, splices)
}

fn apply_splices(source: &str, mut splices: Vec<(Range<usize>, String)>) -> String {
    splices.sort_by_key(|(range, _)| (range.start, range.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, replacement) in splices {
        out.push_str(&source[cursor..range.start]);
        out.push_str(&replacement);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// @version 1.0\n// @namespace http://greasyfork.local/users/1\n// ==/UserScript==\nfoo.baz();\n";

    #[test]
    fn test_replace_keeps_separator() {
        let out = rewrite(SCRIPT, &MetaEdits::new().replace("name", "Something else"));
        assert_eq!(
            out,
            "// ==UserScript==\n// @name\t\tSomething else\n// @description\t\tUnit test.\n// @version 1.0\n// @namespace http://greasyfork.local/users/1\n// ==/UserScript==\nfoo.baz();\n"
        );
    }

    #[test]
    fn test_remove_drops_whole_line() {
        let out = rewrite(SCRIPT, &MetaEdits::new().remove("name"));
        assert_eq!(
            out,
            "// ==UserScript==\n// @description\t\tUnit test.\n// @version 1.0\n// @namespace http://greasyfork.local/users/1\n// ==/UserScript==\nfoo.baz();\n"
        );
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        assert_eq!(rewrite(SCRIPT, &MetaEdits::new().remove("updateUrl")), SCRIPT);
    }

    #[test]
    fn test_replace_absent_key_does_not_create_line() {
        assert_eq!(rewrite(SCRIPT, &MetaEdits::new().replace("updateURL", "x")), SCRIPT);
    }

    #[test]
    fn test_add_if_missing_appends_before_closing_marker() {
        let out = rewrite(
            SCRIPT,
            &MetaEdits::new().add_if_missing("updateURL", "http://example.com"),
        );
        assert_eq!(
            out,
            "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// @version 1.0\n// @namespace http://greasyfork.local/users/1\n// @updateURL http://example.com\n// ==/UserScript==\nfoo.baz();\n"
        );
    }

    #[test]
    fn test_add_if_missing_keeps_existing_value() {
        let js = "// ==UserScript==\n// @name\t\tA Test!\n// @updateURL http://example.com\n// ==/UserScript==\nfoo.baz();\n";
        let out = rewrite(js, &MetaEdits::new().add_if_missing("updateURL", "http://example.net"));
        assert_eq!(out, js);
    }

    #[test]
    fn test_add_if_missing_is_idempotent() {
        let edits = MetaEdits::new()
            .add_if_missing("version", "2")
            .add_if_missing("namespace", "http://example.com");
        let once = rewrite(SCRIPT, &edits);
        assert_eq!(rewrite(&once, &edits), once);
    }

    #[test]
    fn test_replace_only_touches_first_occurrence() {
        let js = "// ==UserScript==\n// @require a.js\n// @require  b.js\n// ==/UserScript==\n";
        let out = rewrite(js, &MetaEdits::new().replace("require", "c.js"));
        assert_eq!(out, "// ==UserScript==\n// @require c.js\n// @require  b.js\n// ==/UserScript==\n");
    }

    #[test]
    fn test_remove_every_occurrence() {
        let js = "// ==UserScript==\n// @require a.js\n// @name x\n// @require b.js\n// ==/UserScript==\n";
        let out = rewrite(js, &MetaEdits::new().remove("require"));
        assert_eq!(out, "// ==UserScript==\n// @name x\n// ==/UserScript==\n");
    }

    #[test]
    fn test_removed_key_can_be_added_back() {
        let js = "// ==UserScript==\n// @version\t\t1\n// ==/UserScript==\n";
        let out = rewrite(
            js,
            &MetaEdits::new().remove("version").add_if_missing("version", "2"),
        );
        assert_eq!(out, "// ==UserScript==\n// @version 2\n// ==/UserScript==\n");
    }

    #[test]
    fn test_replace_key_only_line_adds_single_space() {
        let js = "// ==UserScript==\n// @version\n// ==/UserScript==\n";
        let out = rewrite(js, &MetaEdits::new().replace("version", "1.0"));
        assert_eq!(out, "// ==UserScript==\n// @version 1.0\n// ==/UserScript==\n");
    }

    #[test]
    fn test_non_directive_lines_survive() {
        let js = "/* License info is here */\n// ==UserScript==\n// @name\t\tA Test!\n\n// a remark\n// @updateURL\t\thttp://example.com\n// ==/UserScript==\nfoo.baz();\n";
        let out = rewrite(
            js,
            &MetaEdits::new()
                .remove("updateURL")
                .add_if_missing("version", "1"),
        );
        assert_eq!(
            out,
            "/* License info is here */\n// ==UserScript==\n// @name\t\tA Test!\n\n// a remark\n// @version 1\n// ==/UserScript==\nfoo.baz();\n"
        );
    }

    #[test]
    fn test_crlf_insertions_use_crlf() {
        let js = "// ==UserScript==\r\n// @name x\r\n// ==/UserScript==\r\nbody();\r\n";
        let out = rewrite(js, &MetaEdits::new().add_if_missing("version", "1"));
        assert_eq!(out, "// ==UserScript==\r\n// @name x\r\n// @version 1\r\n// ==/UserScript==\r\nbody();\r\n");
    }

    #[test]
    fn test_no_header_is_noop() {
        let js = "foo.baz();\n";
        let edits = MetaEdits::new().replace("name", "x").add_if_missing("version", "1");
        assert_eq!(rewrite(js, &edits), js);
    }

    #[test]
    fn test_edits_builder_upserts() {
        let edits = MetaEdits::new().replace("version", "1").remove("version");
        assert_eq!(edits, MetaEdits::new().remove("version"));
        assert!(MetaEdits::new().is_empty());
    }
}
