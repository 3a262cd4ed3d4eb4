//! Storage Module
//!
//! In-memory persistence for scripts: content-addressed code blobs and the
//! records, revisions and audit trail that reference them.

pub mod code;
pub mod scripts;

pub use code::{CodeStore, InMemoryCodeStore};
pub use scripts::{RevisionCommit, ScriptStore};
