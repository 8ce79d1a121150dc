//! Records exchanged with the data store.
//!
//! Field names on the wire follow the hosted backend's column names
//! (`meta_title`, `content_config`, `landing_page_id`, ...). The Rust field
//! names describe what the value means to the renderer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Pages ────────────────────────────────────────────────────────────

/// A landing page as stored by content authors.
///
/// Read-only from the renderer's perspective. `content_values` and
/// `custom_css` are untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDefinition {
    pub id: String,
    /// Unique routing key, a single URL path segment.
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    pub template: TemplateDefinition,
    /// Template field name to value. Order is irrelevant.
    #[serde(rename = "content_config", default)]
    pub content_values: HashMap<String, String>,
    #[serde(default)]
    pub custom_css: Option<String>,
    /// The hosted read contract only returns published rows, so a record
    /// without this flag is treated as published.
    #[serde(default = "published_by_default")]
    pub is_published: bool,
}

const fn published_by_default() -> bool {
    true
}

impl PageDefinition {
    /// Title for the document `<title>`: `meta_title` when set, else `title`.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.meta_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.title.as_str())
    }
}

/// A reusable page skeleton with `{{field}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub template_html: String,
    #[serde(default)]
    pub template_config: TemplateConfig,
}

/// Recognized fields and post-submission behaviour of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Field names whose `{{name}}` placeholders receive content values.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Where to send the visitor after a successful form submission.
    /// Untrusted until validated.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

// ── Conversions ──────────────────────────────────────────────────────

/// Kind of visitor interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    PageView,
    FormSubmit,
}

impl ConversionType {
    /// Wire name, as stored in `conversion_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::FormSubmit => "form_submit",
        }
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded visitor interaction with a landing page.
///
/// Created by the renderer, persisted by a sink, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    #[serde(rename = "landing_page_id")]
    pub page_id: String,
    pub conversion_type: ConversionType,
    pub visitor_id: String,
    pub session_id: String,
    /// Submitted fields; only present for `form_submit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ConversionEvent {
    /// A `page_view` event for the given visitor.
    #[must_use]
    pub fn page_view(page_id: &str, visitor_id: &str, session_id: &str) -> Self {
        Self {
            page_id: page_id.to_owned(),
            conversion_type: ConversionType::PageView,
            visitor_id: visitor_id.to_owned(),
            session_id: session_id.to_owned(),
            form_data: None,
            conversion_value: None,
            created_at: Utc::now(),
        }
    }

    /// A `form_submit` event carrying the submitted fields, weighted `1`.
    #[must_use]
    pub fn form_submit(
        page_id: &str,
        visitor_id: &str,
        session_id: &str,
        form_data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            page_id: page_id.to_owned(),
            conversion_type: ConversionType::FormSubmit,
            visitor_id: visitor_id.to_owned(),
            session_id: session_id.to_owned(),
            form_data: Some(form_data),
            conversion_value: Some(1.0),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn page_parses_from_read_contract_shape() {
        let json = r#"{
            "id": "p1",
            "slug": "valuation",
            "title": "Valuation",
            "meta_title": "Free valuation",
            "template": {
                "template_html": "<h1>{{headline}}</h1>",
                "template_config": { "fields": ["headline"], "redirect_url": "/gracias" }
            },
            "content_config": { "headline": "Sell smarter" },
            "custom_css": "h1 { color: navy; }"
        }"#;
        let page: PageDefinition = serde_json::from_str(json).unwrap();
        assert!(page.is_published);
        assert_eq!(page.content_values["headline"], "Sell smarter");
        assert_eq!(page.template.template_config.fields, vec!["headline"]);
        assert_eq!(
            page.template.template_config.redirect_url.as_deref(),
            Some("/gracias")
        );
    }

    #[test]
    fn display_title_falls_back_to_title() {
        let json = r#"{
            "id": "p1", "slug": "s", "title": "Plain", "meta_title": "  ",
            "template": { "template_html": "" }
        }"#;
        let page: PageDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(page.display_title(), "Plain");
    }

    #[test]
    fn event_serializes_to_write_contract_shape() {
        let event = ConversionEvent::page_view("p1", "v1", "s1");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["landing_page_id"], "p1");
        assert_eq!(value["conversion_type"], "page_view");
        assert!(value.get("form_data").is_none());
        assert!(value.get("conversion_value").is_none());
    }

    #[test]
    fn form_submit_carries_unit_value() {
        let mut data = BTreeMap::new();
        data.insert("email".to_owned(), "a@b.co".to_owned());
        let event = ConversionEvent::form_submit("p1", "v1", "s1", data);
        assert_eq!(event.conversion_type, ConversionType::FormSubmit);
        assert_eq!(event.conversion_value, Some(1.0));
        assert_eq!(event.form_data.unwrap()["email"], "a@b.co");
    }

    #[test]
    fn conversion_type_uses_wire_names() {
        let json = serde_json::to_string(&ConversionType::FormSubmit).unwrap();
        assert_eq!(json, r#""form_submit""#);
        assert_eq!(ConversionType::PageView.to_string(), "page_view");
        assert!(serde_json::from_str::<ConversionType>(r#""cta_click""#).is_err());
    }
}
