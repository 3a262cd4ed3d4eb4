//! Submission DTOs

use crate::models::script::{ScriptRecord, ScriptRevision};
use crate::pipeline::{
    Correction, FailureReport, OwnerId, ScriptKind, SubmissionOptions, ValidationOutcome,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to submit a revision of a script
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScriptRequest {
    #[validate(length(min = 1, max = 2000000, message = "Code must be between 1 and 2000000 characters"))]
    pub code: String,
    #[validate(range(min = 1, message = "Author id must be positive"))]
    pub author_id: OwnerId,
    #[serde(default)]
    pub kind: ScriptKind,
    #[validate(length(min = 1, max = 100, message = "Display name must be between 1 and 100 characters"))]
    pub display_name: Option<String>,
    #[serde(default)]
    pub options: SubmissionOptions,
}

/// Request to evaluate code without storing anything
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateScriptRequest {
    /// Evaluate as the next revision of this script
    pub script_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub submission: SubmitScriptRequest,
}

/// Accepted submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub script: ScriptRecord,
    pub revision: ScriptRevision,
    pub corrections: Vec<Correction>,
}

/// Dry-run evaluation result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub accepted: bool,
    pub failures: Vec<FailureReport>,
    pub corrections: Vec<Correction>,
    pub rewritten_code: String,
    pub version: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<ValidationOutcome> for ValidationReport {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            accepted: outcome.is_accepted(),
            failures: outcome.reports(),
            corrections: outcome.corrections,
            rewritten_code: outcome.rewritten_code,
            version: outcome.version,
            namespace: outcome.namespace,
            name: outcome.name,
            description: outcome.description,
        }
    }
}
