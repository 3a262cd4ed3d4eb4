//! Script models
//!
//! Records, accepted revisions and the submission audit trail.

use crate::pipeline::{Correction, OwnerId, PreviousRevision, ScriptKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content-addressed id of a stored code blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeId(pub String);

impl std::fmt::Display for CodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A script as shown to users; reflects its latest accepted revision
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub id: Uuid,
    pub kind: ScriptKind,
    pub authors: Vec<OwnerId>,
    pub name: String,
    pub description: String,
    pub version: String,
    pub namespace: Option<String>,
    pub latest_revision_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScriptRecord {
    /// Snapshot handed to the pipeline when the next revision is evaluated
    pub fn previous_revision(&self) -> PreviousRevision {
        PreviousRevision {
            version: self.version.clone(),
            namespace: self.namespace.clone(),
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
        }
    }
}

/// One accepted revision; code lives in the code store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRevision {
    pub id: Uuid,
    pub script_id: Uuid,
    pub raw_code_id: CodeId,
    pub rewritten_code_id: CodeId,
    pub version: String,
    pub namespace: Option<String>,
    pub accepted_at: DateTime<Utc>,
}

/// Outcome of a submission as recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Accepted,
    Rejected,
}

/// Audit trail entry for one submission attempt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    /// `None` for rejected first revisions
    pub script_id: Option<Uuid>,
    pub revision_id: Option<Uuid>,
    pub author_id: OwnerId,
    pub action: AuditAction,
    pub version: Option<String>,
    /// Failure codes, in check order
    pub failures: Vec<String>,
    pub corrections: Vec<Correction>,
    pub recorded_at: DateTime<Utc>,
}
