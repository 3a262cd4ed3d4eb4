//! Script store
//!
//! In-memory records, revision history and audit trail. Commits are
//! serialized by the write lock and guarded by an optimistic check on the
//! revision the candidate was evaluated against.

use crate::error::AppError;
use crate::models::{AuditEntry, CodeId, ScriptRecord, ScriptRevision};
use crate::pipeline::{OwnerId, ScriptKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Everything needed to accept one revision
#[derive(Debug, Clone)]
pub struct RevisionCommit {
    /// `None` creates a new script
    pub script_id: Option<Uuid>,
    /// Latest revision id seen when the candidate was evaluated
    pub expected_previous: Option<Uuid>,
    pub kind: ScriptKind,
    /// Only used when the script is created
    pub authors: Vec<OwnerId>,
    pub name: String,
    pub description: String,
    pub version: String,
    pub namespace: Option<String>,
    pub raw_code_id: CodeId,
    pub rewritten_code_id: CodeId,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Default)]
struct Scripts {
    records: HashMap<Uuid, ScriptRecord>,
    /// Script ID -> revisions, oldest first
    revisions: HashMap<Uuid, Vec<ScriptRevision>>,
}

/// Thread-safe script store
pub struct ScriptStore {
    scripts: Arc<RwLock<Scripts>>,
    audit: Arc<RwLock<Vec<AuditEntry>>>,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(Scripts::default())),
            audit: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get a script by ID
    pub async fn get(&self, id: Uuid) -> Result<ScriptRecord, AppError> {
        let scripts = self.scripts.read().await;
        scripts
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Script {} not found", id)))
    }

    /// List all scripts, oldest first
    pub async fn list(&self) -> Vec<ScriptRecord> {
        let scripts = self.scripts.read().await;
        let mut records: Vec<ScriptRecord> = scripts.records.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Revision history of a script, oldest first
    pub async fn revisions(&self, id: Uuid) -> Result<Vec<ScriptRevision>, AppError> {
        let scripts = self.scripts.read().await;
        scripts
            .revisions
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Script {} not found", id)))
    }

    /// Latest accepted revision of a script
    pub async fn latest_revision(&self, id: Uuid) -> Result<ScriptRevision, AppError> {
        self.revisions(id)
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Script {} has no revisions", id)))
    }

    /// Accept a revision: append it to the history and overwrite the record.
    ///
    /// Fails with `Conflict` when another revision was accepted since the
    /// candidate was evaluated.
    pub async fn commit(
        &self,
        commit: RevisionCommit,
    ) -> Result<(ScriptRecord, ScriptRevision), AppError> {
        let mut scripts = self.scripts.write().await;

        let existing = match commit.script_id {
            Some(id) => {
                let record = scripts
                    .records
                    .get(&id)
                    .ok_or_else(|| AppError::NotFound(format!("Script {} not found", id)))?;
                if Some(record.latest_revision_id) != commit.expected_previous {
                    return Err(AppError::Conflict(format!(
                        "Script {} changed while the revision was being validated",
                        id
                    )));
                }
                Some(record.clone())
            }
            None => None,
        };

        let script_id = commit.script_id.unwrap_or_else(Uuid::new_v4);
        let revision = ScriptRevision {
            id: Uuid::new_v4(),
            script_id,
            raw_code_id: commit.raw_code_id,
            rewritten_code_id: commit.rewritten_code_id,
            version: commit.version.clone(),
            namespace: commit.namespace.clone(),
            accepted_at: commit.accepted_at,
        };

        let record = match existing {
            Some(previous) => ScriptRecord {
                name: commit.name,
                description: commit.description,
                version: commit.version,
                namespace: commit.namespace,
                latest_revision_id: revision.id,
                updated_at: commit.accepted_at,
                ..previous
            },
            None => ScriptRecord {
                id: script_id,
                kind: commit.kind,
                authors: commit.authors,
                name: commit.name,
                description: commit.description,
                version: commit.version,
                namespace: commit.namespace,
                latest_revision_id: revision.id,
                created_at: commit.accepted_at,
                updated_at: commit.accepted_at,
            },
        };

        scripts.records.insert(script_id, record.clone());
        scripts
            .revisions
            .entry(script_id)
            .or_default()
            .push(revision.clone());

        info!(
            "📝 Script {} accepted revision {} (version {})",
            script_id, revision.id, revision.version
        );
        Ok((record, revision))
    }

    /// Append an entry to the audit trail
    pub async fn record_audit(&self, entry: AuditEntry) {
        let mut audit = self.audit.write().await;
        audit.push(entry);
    }

    /// Audit trail, most recent first, optionally for one script
    pub async fn audit_log(&self, script_id: Option<Uuid>) -> Vec<AuditEntry> {
        let audit = self.audit.read().await;
        audit
            .iter()
            .rev()
            .filter(|e| script_id.map_or(true, |id| e.script_id == Some(id)))
            .cloned()
            .collect()
    }
}

impl Default for ScriptStore {
    fn default() -> Self {
        Self::new()
    }
}
