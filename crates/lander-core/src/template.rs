//! Template variable substitution.
//!
//! `{{name}}` placeholders are replaced in a single left-to-right pass.
//! Names are matched literally (surrounding whitespace ignored); there are no
//! expressions, filters or nested placeholders. A substituted value is never
//! scanned again, so content cannot inject further placeholders.

use std::collections::HashMap;
use std::sync::LazyLock;

use lander_storage::model::TemplateDefinition;
use regex::{Captures, Regex};

use crate::sanitize::{FormBinding, SanitizedDocument, sanitize_document, strip_markup};

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^{}]+?)\}\}").expect("placeholder pattern is a valid literal regex")
});

/// Replace every placeholder in `html`.
///
/// Declared fields get their value reduced to escaped plain text (empty when
/// the value is missing). Undeclared placeholders are blanked.
#[must_use]
pub fn substitute(html: &str, fields: &[String], values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(html, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            if !fields.iter().any(|f| f == name) {
                return String::new();
            }
            values
                .get(name)
                .map(|v| strip_markup(v))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Substitute content into a template and sanitize the result.
///
/// Substitution happens first, so the sanitizer sees the complete document
/// and the template author's own markup is held to the same allow-lists as
/// the content.
#[must_use]
pub fn render_content(
    template: &TemplateDefinition,
    values: &HashMap<String, String>,
    binding: Option<&FormBinding>,
) -> SanitizedDocument {
    let html = substitute(
        &template.template_html,
        &template.template_config.fields,
        values,
    );
    sanitize_document(&html, binding)
}
