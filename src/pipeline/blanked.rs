//! Replacement code for deleted scripts
//!
//! Clients that already installed a script keep polling its code. Once the
//! script is deleted they get a header-only revision with a higher version
//! and a notice as description, which makes the client drop the old body.

use crate::meta::{self, keys, parse_meta, rewrite, MetaEdits};
use crate::policy::next_version;

/// Header-only replacement for `code`, or `None` when it has no header.
pub fn blanked_code(code: &str, notice: &str, dependency_directives: &[String]) -> Option<String> {
    let parsed = parse_meta(code);
    let mut edits = MetaEdits::new().replace(keys::DESCRIPTION, notice);
    if let Some(version) = parsed.first_non_empty(keys::VERSION) {
        edits = edits.replace(keys::VERSION, next_version(version));
    }
    for directive in dependency_directives {
        edits = edits.remove(directive.as_str());
    }
    let edits = edits.add_if_missing(keys::DESCRIPTION, notice);

    meta::meta_block(&rewrite(code, &edits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTICE: &str = "This script was deleted, and has been automatically removed from your browser.";

    fn requires() -> Vec<String> {
        vec!["require".to_string()]
    }

    #[test]
    fn test_blanked_code() {
        let js = "// ==UserScript==\n// @name\t\tA Test!\n// @description\t\tUnit test.\n// @version 2\n// @namespace whatever\n// @require http://www.example.com/script.js\n// @require http://www.example.com/script2.js\n// ==/UserScript==\nvar foo = \"bar\";\n";

        assert_eq!(
            blanked_code(js, NOTICE, &requires()).unwrap(),
            format!("// ==UserScript==\n// @name\t\tA Test!\n// @description\t\t{}\n// @version 2.0.0.1\n// @namespace whatever\n// ==/UserScript==\n", NOTICE)
        );
    }

    #[test]
    fn test_blanked_code_adds_missing_description() {
        let js = "// ==UserScript==\n// @name x\n// @version 1.0.0.1\n// ==/UserScript==\nfoo();";

        assert_eq!(
            blanked_code(js, NOTICE, &requires()).unwrap(),
            format!("// ==UserScript==\n// @name x\n// @version 1.0.0.2\n// @description {}\n// ==/UserScript==\n", NOTICE)
        );
    }

    #[test]
    fn test_blanked_code_without_header() {
        assert_eq!(blanked_code("foo();\n", NOTICE, &requires()), None);
    }
}
