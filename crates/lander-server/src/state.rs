//! Shared application state for `Lander` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use lander_core::LandingRenderer;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Resolves, renders and accepts submissions for pages.
    pub renderer: LandingRenderer,
    /// Whether identity cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}
