//! Content-addressed code store
//!
//! Raw and rewritten code of every revision is stored here. Identical bytes
//! share one blob, so a revision whose canonical text equals its raw text
//! costs a single entry.

use crate::error::AppError;
use crate::models::CodeId;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Blob storage for script code
pub trait CodeStore: Send + Sync {
    /// Store `code` and return its id; storing the same bytes twice returns the same id
    fn store(&self, code: &str) -> Result<CodeId, AppError>;

    fn load(&self, id: &CodeId) -> Result<Option<String>, AppError>;
}

/// SHA-256 hex digest of `code`
pub fn code_id(code: &str) -> CodeId {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    CodeId(format!("{:x}", hasher.finalize()))
}

/// Process-local [`CodeStore`]
#[derive(Default)]
pub struct InMemoryCodeStore {
    blobs: RwLock<HashMap<CodeId, String>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs
    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodeStore for InMemoryCodeStore {
    fn store(&self, code: &str) -> Result<CodeId, AppError> {
        let id = code_id(code);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| AppError::Internal("Code store lock poisoned".to_string()))?;
        if !blobs.contains_key(&id) {
            debug!("Storing code blob {} ({} bytes)", id, code.len());
            blobs.insert(id.clone(), code.to_string());
        }
        Ok(id)
    }

    fn load(&self, id: &CodeId) -> Result<Option<String>, AppError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| AppError::Internal("Code store lock poisoned".to_string()))?;
        Ok(blobs.get(id).cloned())
    }
}
