//! HTTP error types for `Lander` server.
//!
//! Maps domain errors from `lander-core` into HTML responses. Visitors only
//! ever see the generic views; the underlying error is logged.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, warn};

use lander_core::RenderError;

use crate::views;

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No published page at this slug.
    #[error("not found")]
    NotFound,
    /// Client sent invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// A dependency (the page store) is unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, views::not_found_page()),
            Self::BadRequest(msg) => {
                warn!(reason = %msg, "bad request");
                (
                    StatusCode::BAD_REQUEST,
                    views::error_page("Something went wrong", "We could not process that request."),
                )
            }
            Self::Unavailable(msg) => {
                error!(reason = %msg, "service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    views::error_page(
                        "Temporarily unavailable",
                        "This page is temporarily unavailable. Please try again shortly.",
                    ),
                )
            }
        };

        (status, Html(body)).into_response()
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::PageNotFound { .. } => Self::NotFound,
            RenderError::UnknownForm { .. } => Self::BadRequest(err.to_string()),
            RenderError::Store(_) => Self::Unavailable(err.to_string()),
        }
    }
}
