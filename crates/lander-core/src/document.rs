//! The HTML document shell around a rendered page.

use crate::renderer::RenderedPage;
use crate::sanitize::escape_text;

/// Wrap a rendered page in a complete HTML document.
///
/// Only sanitized parts reach the output: the title is escaped, the
/// stylesheet is [`SafeCss`](crate::sanitize::SafeCss) and the body is
/// [`TrustedHtml`](crate::sanitize::TrustedHtml).
#[must_use]
pub fn render_document(page: &RenderedPage) -> String {
    let mut out = String::with_capacity(page.body.as_str().len() + page.css.as_str().len() + 512);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>");
    out.push_str(&escape_text(&page.title));
    out.push_str("</title>\n");
    if !page.css.is_empty() {
        out.push_str("<style>\n");
        out.push_str(page.css.as_str());
        out.push_str("\n</style>\n");
    }
    out.push_str("</head>\n<body>\n<main class=\"landing-page\" data-page=\"");
    out.push_str(&crate::sanitize::escape_attr(&page.slug));
    out.push_str("\">\n");
    out.push_str(page.body.as_str());
    out.push_str("\n</main>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::{sanitize_custom_css, sanitize_html};

    fn page(title: &str, css: &str, body: &str) -> RenderedPage {
        RenderedPage {
            page_id: "p1".to_owned(),
            slug: "valuation".to_owned(),
            title: title.to_owned(),
            body: sanitize_html(body),
            css: sanitize_custom_css(css),
            forms: Vec::new(),
            redirect_url: None,
        }
    }

    #[test]
    fn shell_contains_title_style_and_body() {
        let doc = render_document(&page("Sell", "h1 { color: red; }", "<h1>Hi</h1>"));
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Sell</title>"));
        assert!(doc.contains("<style>\nh1 { color: red; }\n</style>"));
        assert!(doc.contains("<h1>Hi</h1>"));
        assert!(doc.contains(r#"data-page="valuation""#));
    }

    #[test]
    fn title_is_escaped() {
        let doc = render_document(&page("</title><script>alert(1)</script>", "", ""));
        assert!(doc.contains("<title>&lt;/title&gt;&lt;script&gt;"));
        assert!(!doc.contains("<script>"));
    }

    #[test]
    fn empty_css_omits_style_element() {
        let doc = render_document(&page("T", "   ", "<p>x</p>"));
        assert!(!doc.contains("<style>"));
    }

    #[test]
    fn css_cannot_close_style_element() {
        let doc = render_document(&page("T", "p{}</style><script>x</script>", ""));
        assert_eq!(doc.matches("</style>").count(), 1);
        assert!(!doc.contains("<script>"));
    }
}
