//! External collaborators consumed by the pipeline
//!
//! The pipeline only sees these traits. The service wires the default
//! implementations below; deployments can swap any of them.

use crate::pipeline::types::OwnerId;
use regex::Regex;
use serde::Deserialize;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

pub use crate::pipeline::syntax::JavaScriptSyntaxOracle;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read signature file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse signature file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// SYNTAX ORACLE
// =============================================================================

/// Parse problem reported by a [`SyntaxOracle`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub message: String,
    /// 1-based line number
    pub line: usize,
}

/// Decides whether script code parses
pub trait SyntaxOracle: Send + Sync {
    fn check(&self, code: &str) -> Result<(), SyntaxIssue>;
}

// =============================================================================
// SIGNATURE SCANNER
// =============================================================================

/// Hit reported by a [`SignatureScanner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatch {
    pub signature_id: String,
    /// Byte range of the match inside the scanned text
    pub span: Range<usize>,
    /// Authors who legitimately published the matched code, if known
    pub originating_authors: Vec<OwnerId>,
}

/// Matches script bodies against known-bad code fingerprints
pub trait SignatureScanner: Send + Sync {
    fn scan(&self, body: &str) -> Option<SignatureMatch>;
}

/// Fingerprint definition as stored in the signature file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDefinition {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub originating_authors: Vec<OwnerId>,
}

struct Fingerprint {
    id: String,
    pattern: Regex,
    originating_authors: Vec<OwnerId>,
}

/// Regex-based [`SignatureScanner`]; the first matching fingerprint wins
#[derive(Default)]
pub struct FingerprintScanner {
    fingerprints: Vec<Fingerprint>,
}

impl FingerprintScanner {
    pub fn new(definitions: Vec<FingerprintDefinition>) -> Result<Self, CollaboratorError> {
        let fingerprints = definitions
            .into_iter()
            .map(|def| {
                let pattern = Regex::new(&def.pattern).map_err(|source| CollaboratorError::Pattern {
                    pattern: def.pattern.clone(),
                    source,
                })?;
                Ok(Fingerprint {
                    id: def.id,
                    pattern,
                    originating_authors: def.originating_authors,
                })
            })
            .collect::<Result<Vec<_>, CollaboratorError>>()?;
        Ok(Self { fingerprints })
    }

    /// Load fingerprints from a JSON array of [`FingerprintDefinition`]
    pub fn load(path: &Path) -> Result<Self, CollaboratorError> {
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| CollaboratorError::Read {
            path: shown.clone(),
            source,
        })?;
        let definitions: Vec<FingerprintDefinition> =
            serde_json::from_str(&raw).map_err(|source| CollaboratorError::Parse {
                path: shown.clone(),
                source,
            })?;
        let scanner = Self::new(definitions)?;
        info!("Loaded {} disallowed code signatures from {}", scanner.len(), shown);
        Ok(scanner)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl SignatureScanner for FingerprintScanner {
    fn scan(&self, body: &str) -> Option<SignatureMatch> {
        self.fingerprints.iter().find_map(|fp| {
            let hit = fp.pattern.find(body)?;
            debug!("Signature {} matched at {}..{}", fp.id, hit.start(), hit.end());
            Some(SignatureMatch {
                signature_id: fp.id.clone(),
                span: hit.range(),
                originating_authors: fp.originating_authors.clone(),
            })
        })
    }
}

// =============================================================================
// DEPENDENCY ALLOW-LIST
// =============================================================================

/// Decides whether an external resource may be loaded by a script
pub trait DependencyAllowList: Send + Sync {
    fn is_approved(&self, locator: &str) -> bool;
}

/// Allow-list of anchored regular expressions
pub struct PatternAllowList {
    patterns: Vec<Regex>,
}

impl PatternAllowList {
    /// Build from patterns; each pattern must match the whole locator
    pub fn new(patterns: &[String]) -> Result<Self, CollaboratorError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{})$", p)).map_err(|source| CollaboratorError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl DependencyAllowList for PatternAllowList {
    fn is_approved(&self, locator: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(locator))
    }
}

// =============================================================================
// WIRING
// =============================================================================

/// The collaborators one pipeline instance talks to
#[derive(Clone)]
pub struct Collaborators {
    pub syntax: Arc<dyn SyntaxOracle>,
    pub signatures: Arc<dyn SignatureScanner>,
    pub dependencies: Arc<dyn DependencyAllowList>,
}

impl Collaborators {
    /// Default implementations used by the service
    pub fn standard(
        approved_patterns: &[String],
        signatures_path: Option<&Path>,
    ) -> Result<Self, CollaboratorError> {
        let signatures = match signatures_path {
            Some(path) => FingerprintScanner::load(path)?,
            None => FingerprintScanner::default(),
        };
        Ok(Self {
            syntax: Arc::new(JavaScriptSyntaxOracle),
            signatures: Arc::new(signatures),
            dependencies: Arc::new(PatternAllowList::new(approved_patterns)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allow_list_is_anchored() {
        let allow = PatternAllowList::new(&patterns(&[
            r"https?://ajax\.googleapis\.com/ajax/libs/.*",
        ]))
        .unwrap();

        assert!(allow.is_approved("http://ajax.googleapis.com/ajax/libs/jquery/1.9.1/jquery.min.js"));
        assert!(!allow.is_approved("http://example.com"));
        assert!(!allow.is_approved("http://evil.example/?http://ajax.googleapis.com/ajax/libs/x.js"));
    }

    #[test]
    fn test_allow_list_rejects_bad_pattern() {
        assert!(matches!(
            PatternAllowList::new(&patterns(&["("])),
            Err(CollaboratorError::Pattern { .. })
        ));
    }

    #[test]
    fn test_fingerprint_scanner_reports_first_hit() {
        let scanner = FingerprintScanner::new(vec![
            FingerprintDefinition {
                id: "like-jacking".to_string(),
                pattern: r"function Like\(".to_string(),
                originating_authors: vec![],
            },
            FingerprintDefinition {
                id: "copied".to_string(),
                pattern: r"this\.was\.copied".to_string(),
                originating_authors: vec![1],
            },
        ])
        .unwrap();

        let hit = scanner.scan("x();\nfunction Like(p) {}\n").unwrap();
        assert_eq!(hit.signature_id, "like-jacking");
        assert_eq!(hit.span, 5..19);
        assert!(hit.originating_authors.is_empty());

        let hit = scanner.scan("this.was.copied.from.another.script").unwrap();
        assert_eq!(hit.originating_authors, vec![1]);

        assert!(scanner.scan("var foo = 1;").is_none());
    }

    #[test]
    fn test_fingerprint_scanner_loads_json() {
        let path = std::env::temp_dir().join(format!("scriptflow-signatures-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"[{{"id":"a","pattern":"evil\\(\\)","originatingAuthors":[7]}}]"#).unwrap();

        let scanner = FingerprintScanner::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(scanner.len(), 1);
        assert_eq!(scanner.scan("evil()").unwrap().originating_authors, vec![7]);
    }

    #[test]
    fn test_fingerprint_scanner_missing_file() {
        let err = FingerprintScanner::load(Path::new("/nonexistent/signatures.json"));
        assert!(matches!(err, Err(CollaboratorError::Read { .. })));
    }
}
