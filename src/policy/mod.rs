//! Version Policy Module
//!
//! Cross-revision rules: how versions are ordered, advanced and generated,
//! and how a namespace is carried from one revision to the next.

pub mod namespace;
pub mod version;

pub use namespace::{resolve_namespace, NamespaceResolution};
pub use version::{generated_version, is_generated_version, is_newer, next_version};
