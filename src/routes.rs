//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod scripts;

use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Dry-run validation
        .route("/api/validate", post(scripts::validate_script))

        // Scripts
        .route("/api/scripts", get(scripts::list_scripts).post(scripts::create_script))
        .route("/api/scripts/{id}", get(scripts::get_script))
        .route(
            "/api/scripts/{id}/versions",
            get(scripts::list_versions).post(scripts::submit_version),
        )
        .route("/api/scripts/{id}/code", get(scripts::get_code))
        .route("/api/scripts/{id}/meta", get(scripts::get_meta))
        .route("/api/scripts/{id}/blanked", get(scripts::get_blanked))

        // Audit trail
        .route("/api/audit", get(scripts::list_audit))

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    const SCRIPT: &str = "// ==UserScript==\n// @name A Test!\n// @description Unit test.\n// @version 1.0\n// @namespace http://example.com\n// ==/UserScript==\nvar foo = \"bar\";\n";

    fn router() -> Router {
        let settings = Settings::default();
        let state = Arc::new(AppState::new(settings.clone()).unwrap());
        create_router(state, &settings)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_then_reject_stale_version() {
        let app = router();
        let body = serde_json::json!({ "code": SCRIPT, "authorId": 1 });

        let response = app.clone().oneshot(post_json("/api/scripts", body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json_body(response).await;
        let id = created["data"]["script"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(&format!("/api/scripts/{}/versions", id), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let rejected = json_body(response).await;
        assert_eq!(rejected["code"], "SUBMISSION_REJECTED");
        assert_eq!(rejected["failures"][0]["code"], "VERSION_NOT_ADVANCED");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/scripts/{}/code", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validate_reports_failures() {
        let response = router()
            .oneshot(post_json(
                "/api/validate",
                serde_json::json!({ "code": "var foo;\n", "authorId": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = json_body(response).await;
        assert_eq!(report["data"]["accepted"], false);
        assert_eq!(report["data"]["failures"][0]["code"], "HEADER_MISSING");
    }

    #[tokio::test]
    async fn test_unknown_script_is_not_found() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/scripts/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
