//! Script API Routes
//!
//! Submission, dry-run validation and read access to stored scripts.

use crate::error::AppError;
use crate::models::{
    AuditEntry, ScriptRecord, ScriptRevision, SubmissionResponse, SubmitScriptRequest,
    SuccessResponse, ValidateScriptRequest, ValidationReport,
};
use crate::state::SharedState;
use crate::submission;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    /// Only entries for this script
    pub script_id: Option<Uuid>,
}

// ==================== Handlers ====================

/// Evaluate a candidate without storing it
pub async fn validate_script(
    State(state): State<SharedState>,
    Json(req): Json<ValidateScriptRequest>,
) -> Result<Json<SuccessResponse<ValidationReport>>, AppError> {
    let report = submission::preview(&state, req).await?;
    let message = if report.accepted {
        "Code would be accepted".to_string()
    } else {
        format!("Code would be rejected with {} failure(s)", report.failures.len())
    };
    Ok(Json(SuccessResponse::with_data(message, report)))
}

/// Create a script from its first revision
pub async fn create_script(
    State(state): State<SharedState>,
    Json(req): Json<SubmitScriptRequest>,
) -> Result<(StatusCode, Json<SuccessResponse<SubmissionResponse>>), AppError> {
    let response = submission::submit(&state, None, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            format!("Script {} created", response.script.name),
            response,
        )),
    ))
}

/// List all scripts
pub async fn list_scripts(
    State(state): State<SharedState>,
) -> Json<SuccessResponse<Vec<ScriptRecord>>> {
    let scripts = state.scripts.list().await;
    Json(SuccessResponse::with_data(
        format!("{} script(s)", scripts.len()),
        scripts,
    ))
}

/// Get a script
pub async fn get_script(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
) -> Result<Json<SuccessResponse<ScriptRecord>>, AppError> {
    let script = state.scripts.get(script_id).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Script {}", script.name),
        script,
    )))
}

/// Submit a new revision of a script
pub async fn submit_version(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
    Json(req): Json<SubmitScriptRequest>,
) -> Result<Json<SuccessResponse<SubmissionResponse>>, AppError> {
    let response = submission::submit(&state, Some(script_id), req).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("Version {} accepted", response.revision.version),
        response,
    )))
}

/// Revision history of a script
pub async fn list_versions(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
) -> Result<Json<SuccessResponse<Vec<ScriptRevision>>>, AppError> {
    let revisions = state.scripts.revisions(script_id).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} revision(s)", revisions.len()),
        revisions,
    )))
}

/// Latest rewritten code
pub async fn get_code(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let code = submission::latest_code(&state, script_id).await?;
    Ok(javascript(code))
}

/// Header of the latest revision
pub async fn get_meta(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let meta = submission::latest_meta(&state, script_id).await?;
    Ok(javascript(meta))
}

/// Replacement code served once the script is deleted
pub async fn get_blanked(
    State(state): State<SharedState>,
    Path(script_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let code = submission::blanked(&state, script_id).await?;
    Ok(javascript(code))
}

/// Submission audit trail
pub async fn list_audit(
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
) -> Json<SuccessResponse<Vec<AuditEntry>>> {
    let entries = state.scripts.audit_log(query.script_id).await;
    Json(SuccessResponse::with_data(
        format!("{} audit entries", entries.len()),
        entries,
    ))
}

fn javascript(code: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript; charset=utf-8")], code)
}
