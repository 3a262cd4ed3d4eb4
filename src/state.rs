//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::Settings;
use crate::pipeline::{CollaboratorError, Collaborators, ValidationPipeline};
use crate::store::{CodeStore, InMemoryCodeStore, ScriptStore};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,

    /// Validation pipeline with its collaborators
    pub pipeline: ValidationPipeline,

    /// Script records, revisions and audit trail
    pub scripts: ScriptStore,

    /// Content-addressed code blobs
    pub code: Arc<dyn CodeStore>,
}

impl AppState {
    /// Create state with the default collaborators
    pub fn new(settings: Settings) -> Result<Self, CollaboratorError> {
        let collaborators = Collaborators::standard(
            &settings.policy.approved_dependency_patterns,
            settings.policy.disallowed_signatures_path.as_deref(),
        )?;
        Ok(Self::with_collaborators(settings, collaborators))
    }

    pub fn with_collaborators(settings: Settings, collaborators: Collaborators) -> Self {
        let pipeline = ValidationPipeline::new(settings.policy.clone(), collaborators);
        Self {
            settings,
            pipeline,
            scripts: ScriptStore::new(),
            code: Arc::new(InMemoryCodeStore::new()),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
