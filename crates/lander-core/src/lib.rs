//! Core library for `Lander`.
//!
//! Turns a stored landing page definition into safe HTML: template
//! substitution, allow-list HTML sanitization with form binding, custom CSS
//! neutralization, redirect validation and conversion tracking. This crate
//! depends on `lander-storage` for the data-store traits and knows nothing
//! about HTTP.

pub mod document;
pub mod error;
pub mod redirect;
pub mod renderer;
pub mod sanitize;
pub mod template;
pub mod tracking;

pub use lander_storage::model;

pub use document::render_document;
pub use error::{RedirectRejected, RenderError, TrackingFailure};
pub use redirect::{check_redirect_url, validate_redirect_url};
pub use renderer::{LandingRenderer, RenderedPage, SubmissionOutcome, Visitor, submit_path};
pub use sanitize::{SafeCss, TrustedHtml, sanitize_custom_css, sanitize_html};
pub use template::render_content;
pub use tracking::ConversionTracker;
