//! Types for the validation pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a script author
pub type OwnerId = u64;

/// Category of a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    #[default]
    UserScript,
    /// Code meant to be `@require`d by other scripts
    Library,
}

/// Per-submission switches. None of these are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionOptions {
    /// Accept a version that does not advance the previous one
    pub version_check_override: bool,
    /// Accept a namespace that differs from the previous one
    pub namespace_check_override: bool,
    /// Generate `0.0.1.<timestamp>` when no `@version` is declared
    pub add_missing_version: bool,
    /// Use the owner's default namespace when none is declared or inherited
    pub add_missing_namespace: bool,
    /// The submitter confirmed that minified code is intended
    pub minified_confirmation: bool,
    /// Auto-correct version and description problems instead of rejecting
    pub lenient: bool,
}

/// A candidate revision handed to the pipeline
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub code: &'a str,
    pub kind: ScriptKind,
    /// Authors of the script the candidate belongs to
    pub authors: &'a [OwnerId],
    /// Submitting author, used for the default namespace
    pub owner_id: OwnerId,
    /// Name typed by the submitter; only used for libraries
    pub display_name: Option<&'a str>,
    pub options: &'a SubmissionOptions,
    pub submitted_at: DateTime<Utc>,
}

/// Immutable view of the last accepted revision of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousRevision {
    pub version: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Identity field that must resolve to a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Name,
    Description,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityField::Name => write!(f, "name"),
            IdentityField::Description => write!(f, "description"),
        }
    }
}

/// Reason a candidate revision cannot be accepted
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("code is missing the ==UserScript== meta block")]
    HeaderMissing,

    #[error("uses an unapproved external script: @{directive} {value}")]
    UnapprovedDependency { directive: String, value: String },

    /// The signature id stays internal; submitters only see the category.
    #[error("Exception 403001")]
    DisallowedSignature {
        #[serde(skip_serializing)]
        signature_id: String,
    },

    #[error("appears to be an unauthorized copy")]
    UnauthorizedCopy,

    #[error("contains errors: {message}")]
    SyntaxError { message: String },

    #[error("appears to be minified; confirm the submission to keep minified code")]
    AppearsMinified,

    #[error("@version must be greater than the previous version ({previous}), got {candidate}")]
    VersionNotAdvanced { previous: String, candidate: String },

    #[error("code is missing @version")]
    VersionMissing,

    #[error("@namespace must stay {previous}, got {candidate}")]
    NamespaceMismatch { previous: String, candidate: String },

    #[error("code is missing @namespace")]
    NamespaceMissing,

    #[error("@description is too long (maximum is {limit} characters)")]
    DescriptionTooLong { limit: usize },

    #[error("code is missing @{field}")]
    IdentityMissing { field: IdentityField },
}

impl ValidationFailure {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ValidationFailure::HeaderMissing => "HEADER_MISSING",
            ValidationFailure::UnapprovedDependency { .. } => "UNAPPROVED_DEPENDENCY",
            ValidationFailure::DisallowedSignature { .. } => "DISALLOWED_SIGNATURE",
            ValidationFailure::UnauthorizedCopy => "UNAUTHORIZED_COPY",
            ValidationFailure::SyntaxError { .. } => "SYNTAX_ERROR",
            ValidationFailure::AppearsMinified => "APPEARS_MINIFIED",
            ValidationFailure::VersionNotAdvanced { .. } => "VERSION_NOT_ADVANCED",
            ValidationFailure::VersionMissing => "VERSION_MISSING",
            ValidationFailure::NamespaceMismatch { .. } => "NAMESPACE_MISMATCH",
            ValidationFailure::NamespaceMissing => "NAMESPACE_MISSING",
            ValidationFailure::DescriptionTooLong { .. } => "DESCRIPTION_TOO_LONG",
            ValidationFailure::IdentityMissing { .. } => "IDENTITY_MISSING",
        }
    }
}

/// A failure as reported to submitters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub code: &'static str,
    pub message: String,
    pub failure: ValidationFailure,
}

impl From<&ValidationFailure> for FailureReport {
    fn from(failure: &ValidationFailure) -> Self {
        Self {
            code: failure.code(),
            message: failure.to_string(),
            failure: failure.clone(),
        }
    }
}

/// Automatic fix applied while evaluating a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
    VersionGenerated { version: String },
    VersionAdvanced { from: String, to: String },
    NamespaceInherited { namespace: String },
    NamespaceDefaulted { namespace: String },
    DescriptionTruncated { limit: usize },
    DirectiveRemoved { directive: String },
}

/// Result of evaluating one candidate revision
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    /// Failures in check order; empty means accepted
    pub failures: Vec<ValidationFailure>,
    pub corrections: Vec<Correction>,
    /// Canonical form to store and serve
    pub rewritten_code: String,
    pub version: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures formatted for submitters
    pub fn reports(&self) -> Vec<FailureReport> {
        self.failures.iter().map(FailureReport::from).collect()
    }
}
