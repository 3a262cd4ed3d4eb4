//! ScriptFlow API - User Script Revision Gate
//!
//! Accepts revisions of user scripts, validates their `// ==UserScript==`
//! meta block and content, and stores the canonical form of every accepted
//! revision.
//!
//! VALIDATION PIPELINE: every submission goes through the same ordered checks:
//! - Meta block: located, parsed and rewritten into canonical form
//! - Content: dependency allow-list, disallowed signatures, syntax, minification
//! - Version policy: strictly increasing versions, stable namespace
//! - Identity: name and description resolved from the header or the previous revision

mod config;
mod error;
mod meta;
mod models;
mod pipeline;
mod policy;
mod routes;
mod state;
mod store;
mod submission;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting ScriptFlow - User Script Revision Gate...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let state = Arc::new(AppState::new(settings.clone())?);
    info!(
        "✅ Validation pipeline ready ({} approved dependency pattern(s))",
        settings.policy.approved_dependency_patterns.len()
    );

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   POST /api/validate                 - Dry-run validation");
    info!("   POST /api/scripts                  - Create script from first revision");
    info!("   GET  /api/scripts                  - List scripts");
    info!("   GET  /api/scripts/{{id}}             - Get script");
    info!("   POST /api/scripts/{{id}}/versions    - Submit new revision");
    info!("   GET  /api/scripts/{{id}}/versions    - Revision history");
    info!("   GET  /api/scripts/{{id}}/code        - Latest rewritten code");
    info!("   GET  /api/scripts/{{id}}/meta        - Latest meta block");
    info!("   GET  /api/scripts/{{id}}/blanked     - Replacement code for deletion");
    info!("   GET  /api/audit                    - Submission audit trail");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scriptflow_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
