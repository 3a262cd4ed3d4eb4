//! Submission service
//!
//! Glue between the HTTP surface, the validation pipeline and the stores:
//! snapshot the previous revision, evaluate, then store and commit.

use crate::error::AppError;
use crate::meta;
use crate::models::{
    AuditAction, AuditEntry, ScriptRecord, ScriptRevision, SubmissionResponse,
    SubmitScriptRequest, ValidateScriptRequest, ValidationReport,
};
use crate::pipeline::{blanked_code, Candidate, OwnerId, ValidationOutcome};
use crate::state::AppState;
use crate::store::RevisionCommit;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Submit a revision; `script_id` is `None` for a new script.
///
/// Rejected submissions leave the store untouched apart from the audit trail.
pub async fn submit(
    state: &AppState,
    script_id: Option<Uuid>,
    request: SubmitScriptRequest,
) -> Result<SubmissionResponse, AppError> {
    request.validate()?;

    let existing = match script_id {
        Some(id) => Some(state.scripts.get(id).await?),
        None => None,
    };
    let submitted_at = Utc::now();
    let outcome = evaluate(state, existing.as_ref(), &request, submitted_at);

    if !outcome.is_accepted() {
        warn!(
            "Submission by author {} rejected with {} failure(s)",
            request.author_id,
            outcome.failures.len()
        );
        state
            .scripts
            .record_audit(audit_entry(script_id, None, request.author_id, AuditAction::Rejected, &outcome))
            .await;
        return Err(AppError::Rejected(outcome.failures));
    }

    let (script, revision) =
        commit_accepted(state, existing.as_ref(), &request, &outcome, submitted_at).await?;

    state
        .scripts
        .record_audit(audit_entry(
            Some(script.id),
            Some(revision.id),
            request.author_id,
            AuditAction::Accepted,
            &outcome,
        ))
        .await;
    info!(
        "✅ Script {} version {} accepted ({} correction(s))",
        script.id,
        revision.version,
        outcome.corrections.len()
    );

    Ok(SubmissionResponse {
        script,
        revision,
        corrections: outcome.corrections,
    })
}

/// Evaluate without storing anything
pub async fn preview(
    state: &AppState,
    request: ValidateScriptRequest,
) -> Result<ValidationReport, AppError> {
    request.validate()?;

    let existing = match request.script_id {
        Some(id) => Some(state.scripts.get(id).await?),
        None => None,
    };
    let outcome = evaluate(state, existing.as_ref(), &request.submission, Utc::now());
    Ok(ValidationReport::from(outcome))
}

/// Rewritten code of the latest revision
pub async fn latest_code(state: &AppState, script_id: Uuid) -> Result<String, AppError> {
    let revision = state.scripts.latest_revision(script_id).await?;
    state.code.load(&revision.rewritten_code_id)?.ok_or_else(|| {
        AppError::Internal(format!("Code {} of script {} is missing", revision.rewritten_code_id, script_id))
    })
}

/// Header of the latest revision
pub async fn latest_meta(state: &AppState, script_id: Uuid) -> Result<String, AppError> {
    let code = latest_code(state, script_id).await?;
    meta::meta_block(&code)
        .ok_or_else(|| AppError::Internal(format!("Script {} has no meta block", script_id)))
}

/// Code served in place of the script once it is deleted
pub async fn blanked(state: &AppState, script_id: Uuid) -> Result<String, AppError> {
    let code = latest_code(state, script_id).await?;
    let policy = state.pipeline.policy();
    blanked_code(&code, &policy.deletion_notice, &policy.dependency_directives)
        .ok_or_else(|| AppError::Internal(format!("Script {} has no meta block", script_id)))
}

fn evaluate(
    state: &AppState,
    existing: Option<&ScriptRecord>,
    request: &SubmitScriptRequest,
    submitted_at: DateTime<Utc>,
) -> ValidationOutcome {
    let default_authors = [request.author_id];
    let authors = existing.map_or(&default_authors[..], |r| r.authors.as_slice());
    let previous = existing.map(ScriptRecord::previous_revision);

    let candidate = Candidate {
        code: &request.code,
        kind: existing.map_or(request.kind, |r| r.kind),
        authors,
        owner_id: request.author_id,
        display_name: request.display_name.as_deref(),
        options: &request.options,
        submitted_at,
    };
    state.pipeline.evaluate(&candidate, previous.as_ref())
}

/// Store the code blobs and commit the accepted revision.
///
/// Losing the race against a concurrent revision is audited as a rejection.
async fn commit_accepted(
    state: &AppState,
    existing: Option<&ScriptRecord>,
    request: &SubmitScriptRequest,
    outcome: &ValidationOutcome,
    submitted_at: DateTime<Utc>,
) -> Result<(ScriptRecord, ScriptRevision), AppError> {
    let raw_code_id = state.code.store(&request.code)?;
    let rewritten_code_id = state.code.store(&outcome.rewritten_code)?;

    let commit = RevisionCommit {
        script_id: existing.map(|r| r.id),
        expected_previous: existing.map(|r| r.latest_revision_id),
        kind: request.kind,
        authors: vec![request.author_id],
        name: resolved(&outcome.name, "name")?,
        description: resolved(&outcome.description, "description")?,
        version: resolved(&outcome.version, "version")?,
        namespace: outcome.namespace.clone(),
        raw_code_id,
        rewritten_code_id,
        accepted_at: submitted_at,
    };

    match state.scripts.commit(commit).await {
        Err(AppError::Conflict(message)) => {
            warn!("Submission by author {} lost a concurrent update: {}", request.author_id, message);
            let mut entry = audit_entry(
                existing.map(|r| r.id),
                None,
                request.author_id,
                AuditAction::Rejected,
                outcome,
            );
            entry.failures.push("CONFLICT".to_string());
            state.scripts.record_audit(entry).await;
            Err(AppError::Conflict(message))
        }
        committed => committed,
    }
}

fn resolved(value: &Option<String>, field: &str) -> Result<String, AppError> {
    value
        .clone()
        .ok_or_else(|| AppError::Internal(format!("Accepted revision has no {}", field)))
}

fn audit_entry(
    script_id: Option<Uuid>,
    revision_id: Option<Uuid>,
    author_id: OwnerId,
    action: AuditAction,
    outcome: &ValidationOutcome,
) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4(),
        script_id,
        revision_id,
        author_id,
        action,
        version: outcome.version.clone(),
        failures: outcome.failures.iter().map(|f| f.code().to_string()).collect(),
        corrections: outcome.corrections.clone(),
        recorded_at: Utc::now(),
    }
}
