//! JavaScript syntax oracle
//!
//! Parses the full script text (header lines are plain comments) as a
//! classic script and reports the first diagnostic.

use crate::pipeline::collaborators::{SyntaxIssue, SyntaxOracle};
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use tracing::debug;

/// [`SyntaxOracle`] backed by the oxc JavaScript parser
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptSyntaxOracle;

impl SyntaxOracle for JavaScriptSyntaxOracle {
    fn check(&self, code: &str) -> Result<(), SyntaxIssue> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, code, SourceType::cjs()).parse();

        let Some(diagnostic) = parsed.errors.first() else {
            return Ok(());
        };
        debug!("Parser reported {} diagnostics", parsed.errors.len());

        let offset = diagnostic
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        Err(SyntaxIssue {
            message: diagnostic.message.to_string(),
            line: line_for_offset(code, offset),
        })
    }
}

/// 1-based line containing byte `offset`
fn line_for_offset(code: &str, offset: usize) -> usize {
    let end = offset.min(code.len());
    code.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
