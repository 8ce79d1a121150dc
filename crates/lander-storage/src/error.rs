//! Storage error types.
//!
//! Every variant carries the key or path involved, so a log line is enough
//! to tell which page or sink misbehaved.

/// Errors that can occur while reading pages or writing conversion events.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open or connect to the backend.
    #[error("failed to open storage at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Failed to read a page definition.
    #[error("failed to read page '{slug}': {reason}")]
    Read { slug: String, reason: String },

    /// Failed to persist a conversion event.
    #[error("failed to write conversion for page '{page_id}': {reason}")]
    Write { page_id: String, reason: String },

    /// A seed file could not be loaded.
    #[error("invalid seed file '{path}': {reason}")]
    Seed { path: String, reason: String },

    /// A record could not be encoded or decoded.
    #[error("serialization failed: {reason}")]
    Serialization { reason: String },
}
