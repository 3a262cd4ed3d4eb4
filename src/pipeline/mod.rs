//! Validation Pipeline Module
//!
//! Decides whether a candidate revision of a script may be accepted:
//!
//! 1. **Collaborators**: syntax oracle, signature scanner, dependency allow-list
//! 2. **Engine**: ordered checks producing failures, corrections and the canonical text
//! 3. **Blanked code**: header-only replacement published for deleted scripts

pub mod blanked;
pub mod collaborators;
pub mod engine;
pub mod syntax;
pub mod types;

// Re-export main types for convenient access
pub use blanked::blanked_code;
pub use collaborators::{CollaboratorError, Collaborators};
pub use engine::ValidationPipeline;
pub use types::{
    Candidate, Correction, FailureReport, IdentityField, OwnerId, PreviousRevision, ScriptKind,
    SubmissionOptions, ValidationFailure, ValidationOutcome,
};
