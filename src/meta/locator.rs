//! Meta block locator
//!
//! Finds the byte span of the header. The opening and closing marker lines
//! must match exactly; the first opening marker and the first closing marker
//! after it win.

use super::lines_with_offsets;
use serde::Serialize;

pub const OPENING_MARKER: &str = "// ==UserScript==";
pub const CLOSING_MARKER: &str = "// ==/UserScript==";

/// Byte span of the header inside a script
///
/// `end` points right after the closing marker, before its line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetaBlockSpan {
    pub start: usize,
    pub end: usize,
}

impl MetaBlockSpan {
    /// Header text from the opening marker through the closing marker
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Offset of the first byte of the closing marker line
    pub fn closing_line_start(&self) -> usize {
        self.end - CLOSING_MARKER.len()
    }

    /// Line terminator used by the header (`\r\n` or `\n`)
    pub fn line_terminator(&self, source: &str) -> &'static str {
        let header = self.text(source);
        match header.find('\n') {
            Some(idx) if idx > 0 && header.as_bytes()[idx - 1] == b'\r' => "\r\n",
            _ => "\n",
        }
    }
}

/// Locate the header inside `source`.
pub fn locate(source: &str) -> Option<MetaBlockSpan> {
    let mut start = None;
    for line in lines_with_offsets(source) {
        match start {
            None if line.content == OPENING_MARKER => start = Some(line.start),
            Some(start) if line.content == CLOSING_MARKER => {
                return Some(MetaBlockSpan {
                    start,
                    end: line.content_end(),
                });
            }
            _ => {}
        }
    }
    None
}

/// Split `source` into the text before the header and the text after it.
///
/// The second part still starts with the closing marker's line terminator.
/// Without a header the whole source is returned as the first part.
pub fn split(source: &str) -> (&str, &str) {
    match locate(source) {
        Some(span) => (&source[..span.start], &source[span.end..]),
        None => (source, ""),
    }
}

/// Standalone header text, with one trailing line terminator when the source
/// had one after the closing marker.
pub fn meta_block(source: &str) -> Option<String> {
    let span = locate(source)?;
    let mut block = span.text(source).to_string();
    let rest = &source[span.end..];
    if rest.starts_with("\r\n") {
        block.push_str("\r\n");
    } else if rest.starts_with('\n') {
        block.push('\n');
    }
    Some(block)
}

/// Script text outside the header (everything before it followed by everything after it)
pub fn body(source: &str) -> String {
    let (pre, post) = split(source);
    let mut body = String::with_capacity(pre.len() + post.len());
    body.push_str(pre);
    body.push_str(post);
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// ==/UserScript==\nvar foo = \"bar\";\n";

    #[test]
    fn test_locate_finds_marker_lines() {
        let span = locate(SCRIPT).unwrap();
        assert_eq!(span.start, 0);
        assert!(span.text(SCRIPT).ends_with(CLOSING_MARKER));
        assert_eq!(&SCRIPT[span.end..span.end + 1], "\n");
    }

    #[test]
    fn test_meta_block_appends_trailing_newline() {
        assert_eq!(
            meta_block(SCRIPT).unwrap(),
            "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// ==/UserScript==\n"
        );
    }

    #[test]
    fn test_meta_block_without_header() {
        assert!(locate("var foo = \"bar\";\n").is_none());
        assert!(meta_block("var foo = \"bar\";\n").is_none());
    }

    #[test]
    fn test_split_header_at_top() {
        let js = "// ==UserScript==\n// @name\t\tA Test!\n// @version 1.0\n// ==/UserScript==\nvar foo = 'bar';\nfoo.baz();\n";
        assert_eq!(split(js), ("", "\nvar foo = 'bar';\nfoo.baz();\n"));
    }

    #[test]
    fn test_split_header_not_at_top() {
        let js = "var foo = 'bar';\n// ==UserScript==\n// @name\t\tA Test!\n// ==/UserScript==\nfoo.baz();\n";
        assert_eq!(split(js), ("var foo = 'bar';\n", "\nfoo.baz();\n"));
    }

    #[test]
    fn test_split_without_header() {
        let js = "var foo = 'bar';\nfoo.baz();\n";
        assert_eq!(split(js), (js, ""));
    }

    #[test]
    fn test_split_round_trip() {
        let sources = [
            SCRIPT,
            "/* license */\n// ==UserScript==\n// @name x\n// ==/UserScript==",
            "// ==UserScript==\r\n// @name x\r\n// ==/UserScript==\r\nbody();\r\n",
        ];
        for source in sources {
            let span = locate(source).unwrap();
            let (pre, post) = split(source);
            assert_eq!(format!("{}{}{}", pre, span.text(source), post), source);
        }
    }

    #[test]
    fn test_markers_must_match_whole_line() {
        let js = "  // ==UserScript==\n// @name x\n// ==/UserScript== \n";
        assert!(locate(js).is_none());
    }

    #[test]
    fn test_first_marker_pair_wins() {
        let js = "// ==UserScript==\n// @name a\n// ==/UserScript==\n// ==UserScript==\n// @name b\n// ==/UserScript==\n";
        let span = locate(js).unwrap();
        assert_eq!(span.text(js), "// ==UserScript==\n// @name a\n// ==/UserScript==");
    }

    #[test]
    fn test_crlf_header() {
        let js = "// ==UserScript==\r\n// @name x\r\n// ==/UserScript==\r\nbody();\r\n";
        let span = locate(js).unwrap();
        assert_eq!(span.line_terminator(js), "\r\n");
        assert_eq!(&js[span.end..], "\r\nbody();\r\n");
        assert!(meta_block(js).unwrap().ends_with("==/UserScript==\r\n"));
    }

    #[test]
    fn test_body_excludes_header() {
        let js = "/* a */\n// ==UserScript==\n// @name x\n// ==/UserScript==\nb();\n";
        assert_eq!(body(js), "/* a */\n\nb();\n");
    }
}
