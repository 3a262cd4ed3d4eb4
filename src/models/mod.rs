//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the stored script entities and the request/response structures
//! used by the API.

pub mod script;
pub mod submission;

// Re-export commonly used types
pub use script::*;
pub use submission::*;

use serde::Serialize;

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}
