//! Namespace resolution
//!
//! A script keeps its namespace across revisions. Candidates that omit
//! `@namespace` inherit the previous one, or get a per-owner default when the
//! submitter asked for it.

use crate::pipeline::types::OwnerId;

/// Where the namespace of a candidate comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceResolution {
    /// Declared in the candidate header
    Declared(String),
    /// Copied from the previous accepted revision
    Inherited(String),
    /// Synthesized for the owner
    Defaulted(String),
    Missing,
}

impl NamespaceResolution {
    pub fn value(&self) -> Option<&str> {
        match self {
            NamespaceResolution::Declared(ns)
            | NamespaceResolution::Inherited(ns)
            | NamespaceResolution::Defaulted(ns) => Some(ns),
            NamespaceResolution::Missing => None,
        }
    }
}

/// Resolve the namespace of a candidate revision.
pub fn resolve_namespace(
    declared: Option<&str>,
    previous: Option<&str>,
    add_missing: bool,
    owner_id: OwnerId,
    base_url: &str,
) -> NamespaceResolution {
    if let Some(ns) = declared {
        return NamespaceResolution::Declared(ns.to_string());
    }
    if let Some(ns) = previous {
        return NamespaceResolution::Inherited(ns.to_string());
    }
    if add_missing {
        return NamespaceResolution::Defaulted(default_namespace(base_url, owner_id));
    }
    NamespaceResolution::Missing
}

/// Per-owner default namespace, e.g. `http://localhost/users/1`
pub fn default_namespace(base_url: &str, owner_id: OwnerId) -> String {
    format!("{}/users/{}", base_url.trim_end_matches('/'), owner_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost/";

    #[test]
    fn test_declared_wins() {
        let r = resolve_namespace(Some("http://a"), Some("http://b"), true, 1, BASE);
        assert_eq!(r, NamespaceResolution::Declared("http://a".to_string()));
    }

    #[test]
    fn test_inherit_without_opt_in() {
        let r = resolve_namespace(None, Some("http://example.com"), false, 1, BASE);
        assert_eq!(r, NamespaceResolution::Inherited("http://example.com".to_string()));
        assert_eq!(r.value(), Some("http://example.com"));
    }

    #[test]
    fn test_default_requires_opt_in() {
        assert_eq!(
            resolve_namespace(None, None, false, 1, BASE),
            NamespaceResolution::Missing
        );
        assert_eq!(
            resolve_namespace(None, None, true, 1, BASE),
            NamespaceResolution::Defaulted("http://localhost/users/1".to_string())
        );
    }

    #[test]
    fn test_default_namespace_joins_base() {
        assert_eq!(default_namespace("https://scripts.example", 42), "https://scripts.example/users/42");
    }
}
