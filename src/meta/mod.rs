//! Meta Block Module
//!
//! Everything that touches the `// ==UserScript==` header of a script:
//!
//! 1. **Locator**: find the header span and split the surrounding text
//! 2. **Parser**: turn the header into an ordered list of `@key value` directives
//! 3. **Rewriter**: replace / remove / append directives without disturbing other bytes

pub mod locator;
pub mod parser;
pub mod rewriter;

pub use locator::{body, locate, meta_block};
pub use parser::{parse_directives, parse_meta, ParsedMeta};
pub use rewriter::{rewrite, MetaEdits};

/// Well-known directive keys
pub mod keys {
    pub const NAME: &str = "name";
    pub const NAMESPACE: &str = "namespace";
    pub const VERSION: &str = "version";
    pub const DESCRIPTION: &str = "description";
}

/// One physical line of source text with its byte offsets
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    /// Offset of the first byte of the line
    pub start: usize,
    /// Line content without `\n` / `\r\n`
    pub content: &'a str,
    /// Offset right after the line terminator (start of the next line)
    pub next: usize,
}

impl Line<'_> {
    /// Offset right after the last content byte
    pub fn content_end(&self) -> usize {
        self.start + self.content.len()
    }
}

/// Iterate over the lines of `text` keeping absolute byte offsets.
pub(crate) fn lines_with_offsets(text: &str) -> impl Iterator<Item = Line<'_>> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let content = raw.strip_suffix('\n').unwrap_or(raw);
        let content = content.strip_suffix('\r').unwrap_or(content);
        Line {
            start,
            content,
            next: offset,
        }
    })
}
