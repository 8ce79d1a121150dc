//! Error types for `lander-core`.
//!
//! Only [`RenderError`] ever reaches the HTTP layer. [`TrackingFailure`] and
//! [`RedirectRejected`] are recovered inside the renderer and logged.

use lander_storage::StorageError;

/// Errors from resolving and rendering a landing page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No published page is routed at this slug.
    #[error("no published landing page for slug '{slug}'")]
    PageNotFound { slug: String },

    /// A submission named a form the page does not render.
    #[error("page '{slug}' has no form #{index}")]
    UnknownForm { slug: String, index: usize },

    /// The page store could not be reached.
    #[error("page store error: {0}")]
    Store(#[from] StorageError),
}

/// A conversion event could not be persisted by one or more sinks.
#[derive(Debug, thiserror::Error)]
#[error("conversion tracking failed in sink(s) {sinks}: {reason}")]
pub struct TrackingFailure {
    /// Comma-separated names of the failing sinks.
    pub sinks: String,
    /// First failure message.
    pub reason: String,
}

/// A configured post-submission redirect did not pass validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("redirect target '{url}' rejected: {reason}")]
pub struct RedirectRejected {
    pub url: String,
    pub reason: &'static str,
}
