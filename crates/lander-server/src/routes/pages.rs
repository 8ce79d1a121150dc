//! Landing page routes: `GET /{slug}` and `POST /{slug}/submit`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::debug;

use lander_core::sanitize::FORM_INDEX_FIELD;
use lander_core::{SubmissionOutcome, render_document};

use crate::cookies::VisitorIdentity;
use crate::error::AppError;
use crate::state::AppState;
use crate::views;

/// Largest accepted form submission body.
pub const MAX_SUBMISSION_BYTES: usize = 64 * 1024;

/// In-flight submissions allowed at once.
pub const SUBMIT_CONCURRENCY: usize = 64;

/// Build the page router.
pub fn router() -> Router<Arc<AppState>> {
    let submit = Router::new()
        .route("/{slug}/submit", post(submit_form))
        .layer(ConcurrencyLimitLayer::new(SUBMIT_CONCURRENCY))
        .layer(RequestBodyLimitLayer::new(MAX_SUBMISSION_BYTES));

    Router::new().route("/{slug}", get(show_page)).merge(submit)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Render a published page as a full HTML document.
async fn show_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let identity = VisitorIdentity::from_headers(&headers, state.secure_cookies);
    let page = state.renderer.render_page(&slug, &identity.visitor).await?;

    let mut response = Html(render_document(&page)).into_response();
    identity.apply(response.headers_mut());
    Ok(response)
}

/// Accept a bound form's submission.
///
/// Answers `303 See Other` to the page's validated redirect, or the generic
/// confirmation view.
async fn submit_form(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let index = form_index(&fields)?;
    let identity = VisitorIdentity::from_headers(&headers, state.secure_cookies);

    let outcome = state
        .renderer
        .handle_form_submission(&slug, index, fields, &identity.visitor)
        .await?;

    let mut response = match outcome {
        SubmissionOutcome::Redirect(url) => {
            debug!(slug = %slug, "redirecting after submission");
            Redirect::to(&url).into_response()
        }
        SubmissionOutcome::Confirmation => Html(views::confirmation_page()).into_response(),
    };
    identity.apply(response.headers_mut());
    Ok(response)
}

/// The `_form` ordinal injected into every bound form.
fn form_index(fields: &[(String, String)]) -> Result<usize, AppError> {
    let raw = fields
        .iter()
        .find(|(name, _)| name == FORM_INDEX_FIELD)
        .map(|(_, value)| value.trim())
        .ok_or_else(|| AppError::BadRequest(format!("missing {FORM_INDEX_FIELD} field")))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid {FORM_INDEX_FIELD} value")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn form_index_is_read_from_hidden_field() {
        assert_eq!(form_index(&fields(&[("email", "x"), ("_form", " 2 ")])).unwrap(), 2);
    }

    #[test]
    fn missing_or_bad_index_is_bad_request() {
        assert!(matches!(form_index(&fields(&[("email", "x")])), Err(AppError::BadRequest(_))));
        assert!(matches!(form_index(&fields(&[("_form", "-1")])), Err(AppError::BadRequest(_))));
    }
}
