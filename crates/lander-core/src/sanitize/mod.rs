//! Sanitizers for author-controlled content.
//!
//! - [`html`]: allow-list HTML sanitizer and form binding.
//! - [`css`]: pattern-based neutralization of custom CSS.

pub mod css;
pub mod html;

pub use css::{BLOCKED_MARKER, SafeCss, sanitize_custom_css};
pub use html::{
    FORM_INDEX_FIELD, FormBinding, FormDescriptor, HONEYPOT_FIELD, SanitizedDocument,
    TrustedHtml, escape_attr, escape_text, sanitize_document, sanitize_html, strip_markup,
};
