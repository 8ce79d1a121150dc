//! Allow-list HTML sanitizer.
//!
//! Input is parsed as a body fragment by html5ever (through `scraper`), so
//! malformed and deeply nested markup is normalized exactly the way a browser
//! would see it. The tree is then re-serialized by an explicit-stack walk
//! (no recursion, no regex):
//!
//! - allowed tags are emitted with their allowed attributes only;
//! - dangerous containers (`script`, `iframe`, `svg`, ...) are dropped with
//!   everything inside them;
//! - any other tag is unwrapped: the tag goes, its children stay;
//! - comments, doctypes and processing instructions are dropped;
//! - text and attribute values are re-escaped.
//!
//! When a [`FormBinding`] is supplied, every `<form>` is rewritten to post to
//! the binding's action and described in the returned [`FormDescriptor`]s.

use std::fmt;

use scraper::{ElementRef, Html, Node};

use super::css::sanitize_custom_css;

/// Hidden field carrying the ordinal of the submitted form.
pub const FORM_INDEX_FIELD: &str = "_form";

/// Visually hidden trap field. Humans leave it empty.
pub const HONEYPOT_FIELD: &str = "_hp_company_site";

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "b", "blockquote", "br", "button", "caption",
    "cite", "code", "col", "colgroup", "dd", "del", "details", "dfn", "div", "dl", "dt", "em",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "i", "img", "input", "ins", "kbd", "label", "legend", "li", "main", "mark",
    "nav", "ol", "optgroup", "option", "p", "picture", "pre", "q", "s", "section", "select",
    "small", "source", "span", "strong", "sub", "summary", "sup", "table", "tbody", "td",
    "textarea", "tfoot", "th", "thead", "time", "tr", "u", "ul",
];

/// Dropped together with their content.
const DROPPED_TAGS: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "link",
    "meta", "base", "noscript", "noembed", "noframes", "template", "svg", "math", "xmp",
    "plaintext", "title", "head",
];

const VOID_TAGS: &[&str] = &["br", "col", "hr", "img", "input", "source"];

const ALLOWED_ATTRS: &[&str] = &[
    "action", "alt", "autocomplete", "checked", "cite", "class", "cols", "colspan", "datetime",
    "dir", "disabled", "for", "headers", "height", "href", "id", "label", "lang", "loading",
    "max", "maxlength", "media", "method", "min", "minlength", "multiple", "name", "open",
    "pattern", "placeholder", "readonly", "rel", "required", "reversed", "role", "rows",
    "rowspan", "scope", "selected", "size", "sizes", "span", "src", "srcset", "start", "step",
    "style", "tabindex", "target", "title", "type", "value", "width",
];

const URL_ATTRS: &[&str] = &["href", "src", "action", "cite"];

const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

const FIELD_TAGS: &[&str] = &["input", "select", "textarea", "button"];

// ── Output types ─────────────────────────────────────────────────────

/// HTML that has been through this sanitizer.
///
/// Only this module can construct it, so a rendering layer that accepts
/// `&TrustedHtml` cannot be handed unsanitized markup by mistake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrustedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where bound forms submit to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormBinding {
    pub action: String,
}

/// A `<form>` found while sanitizing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDescriptor {
    /// Ordinal among the page's forms, in document order.
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Names of the form's controls, first occurrence order, no duplicates.
    pub fields: Vec<String>,
}

impl FormDescriptor {
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Sanitized markup plus the forms discovered in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedDocument {
    pub html: TrustedHtml,
    pub forms: Vec<FormDescriptor>,
}

// ── Entry points ─────────────────────────────────────────────────────

/// Sanitize an HTML fragment against the allow-lists.
///
/// Forms are kept but not bound.
#[must_use]
pub fn sanitize_html(html: &str) -> TrustedHtml {
    sanitize_document(html, None).html
}

/// Sanitize an HTML fragment and, if `binding` is set, bind its forms.
#[must_use]
pub fn sanitize_document(html: &str, binding: Option<&FormBinding>) -> SanitizedDocument {
    let fragment = Html::parse_fragment(html);
    let mut walker = Walker {
        out: String::with_capacity(html.len()),
        forms: Vec::new(),
        open_forms: Vec::new(),
        binding,
    };
    walker.run(fragment.root_element());
    SanitizedDocument {
        html: TrustedHtml(walker.out),
        forms: walker.forms,
    }
}

/// Reduce untrusted input to escaped plain text.
///
/// Every tag is removed; the text inside dropped containers (`script`,
/// `style`, ...) is discarded as well. The result is safe to splice into
/// element content or a quoted attribute value.
#[must_use]
pub fn strip_markup(value: &str) -> String {
    if !value.contains(['<', '&']) {
        return escape_attr(value);
    }

    let fragment = Html::parse_fragment(value);
    let mut text = String::with_capacity(value.len());
    let mut stack = Vec::new();
    push_children(fragment.root_element(), &mut stack);

    while let Some(step) = stack.pop() {
        match step {
            Step::Text(t) => text.push_str(t),
            Step::Enter(el) if !DROPPED_TAGS.contains(&el.value().name()) => {
                push_children(el, &mut stack);
            }
            Step::Enter(_) | Step::Close { .. } => {}
        }
    }

    escape_attr(&text)
}

/// Escape text for element content.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a double- or single-quoted attribute value.
#[must_use]
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tree walk ────────────────────────────────────────────────────────

enum Step<'a> {
    Enter(ElementRef<'a>),
    Text(&'a str),
    Close { name: &'a str, is_form: bool },
}

/// Push `el`'s children so that popping yields them in document order.
fn push_children<'a>(el: ElementRef<'a>, stack: &mut Vec<Step<'a>>) {
    for child in el.children().rev() {
        match child.value() {
            Node::Text(text) => stack.push(Step::Text(text)),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    stack.push(Step::Enter(child_el));
                }
            }
            _ => {}
        }
    }
}

struct Walker<'b> {
    out: String,
    forms: Vec<FormDescriptor>,
    /// Indexes into `forms` for the `<form>` elements currently open.
    open_forms: Vec<usize>,
    binding: Option<&'b FormBinding>,
}

impl Walker<'_> {
    fn run(&mut self, root: ElementRef<'_>) {
        let mut stack = Vec::new();
        push_children(root, &mut stack);

        while let Some(step) = stack.pop() {
            match step {
                Step::Text(t) => self.out.push_str(&escape_text(t)),
                Step::Close { name, is_form } => {
                    if is_form {
                        self.open_forms.pop();
                    }
                    self.out.push_str("</");
                    self.out.push_str(name);
                    self.out.push('>');
                }
                Step::Enter(el) => {
                    let name = el.value().name();
                    if DROPPED_TAGS.contains(&name) {
                        continue;
                    }
                    if !ALLOWED_TAGS.contains(&name) {
                        push_children(el, &mut stack);
                        continue;
                    }

                    self.open_tag(el, name);
                    if VOID_TAGS.contains(&name) {
                        continue;
                    }
                    let is_form = name == "form";
                    if is_form {
                        self.open_forms.push(self.forms.len() - 1);
                        self.inject_form_controls();
                    }
                    stack.push(Step::Close { name, is_form });
                    push_children(el, &mut stack);
                }
            }
        }
    }

    fn open_tag(&mut self, el: ElementRef<'_>, name: &str) {
        let element = el.value();
        let is_form = name == "form";
        let bound = is_form && self.binding.is_some();

        self.out.push('<');
        self.out.push_str(name);

        // Attribute order is not stable across parser builds; emit sorted.
        let mut attrs: Vec<(&str, &str)> = element.attrs().collect();
        attrs.sort_unstable_by_key(|(attr, _)| *attr);

        let mut opens_new_window = false;
        for (attr, value) in attrs {
            let Some(value) = filter_attr(attr, value) else {
                continue;
            };
            if bound && matches!(attr, "action" | "method") {
                continue;
            }
            if name == "a" && attr == "rel" {
                continue;
            }
            if name == "a" && attr == "target" && value.eq_ignore_ascii_case("_blank") {
                opens_new_window = true;
            }
            self.write_attr(attr, &value);
        }

        if name == "a" {
            if opens_new_window {
                self.write_attr("rel", "noopener noreferrer");
            } else if let Some(rel) = element.attr("rel") {
                self.write_attr("rel", rel);
            }
        }

        if is_form {
            self.forms.push(FormDescriptor {
                index: self.forms.len(),
                id: element.attr("id").map(str::to_owned),
                name: element.attr("name").map(str::to_owned),
                fields: Vec::new(),
            });
            if let Some(binding) = self.binding {
                self.write_attr("method", "post");
                self.write_attr("action", &binding.action);
            }
        }

        if FIELD_TAGS.contains(&name) {
            self.note_field(element.attr("name"));
        }

        self.out.push('>');
    }

    fn write_attr(&mut self, attr: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(attr);
        self.out.push_str("=\"");
        self.out.push_str(&escape_attr(value));
        self.out.push('"');
    }

    fn inject_form_controls(&mut self) {
        if self.binding.is_none() {
            return;
        }
        let index = self.forms.len() - 1;
        self.out.push_str(&format!(
            "<input type=\"hidden\" name=\"{FORM_INDEX_FIELD}\" value=\"{index}\">"
        ));
        self.out.push_str(&format!(
            "<input type=\"text\" name=\"{HONEYPOT_FIELD}\" value=\"\" tabindex=\"-1\" \
             autocomplete=\"off\" aria-hidden=\"true\" \
             style=\"position:absolute;left:-10000px;width:1px;height:1px;overflow:hidden\">"
        ));
    }

    fn note_field(&mut self, name: Option<&str>) {
        let (Some(name), Some(&form)) = (name, self.open_forms.last()) else {
            return;
        };
        if name.is_empty() || name == FORM_INDEX_FIELD || name == HONEYPOT_FIELD {
            return;
        }
        let descriptor = &mut self.forms[form];
        if !descriptor.has_field(name) {
            descriptor.fields.push(name.to_owned());
        }
    }
}

// ── Attribute policy ─────────────────────────────────────────────────

/// Decide whether an attribute survives, returning its (possibly rewritten)
/// value.
fn filter_attr(attr: &str, value: &str) -> Option<String> {
    if attr.starts_with("on") || !is_plain_attr_name(attr) {
        return None;
    }
    let allowed = ALLOWED_ATTRS.contains(&attr)
        || attr.starts_with("aria-")
        || attr.starts_with("data-");
    if !allowed {
        return None;
    }

    if URL_ATTRS.contains(&attr) {
        return is_safe_url(value).then(|| value.to_owned());
    }
    match attr {
        "srcset" => value
            .split(',')
            .filter_map(|candidate| candidate.split_whitespace().next())
            .all(is_safe_url)
            .then(|| value.to_owned()),
        "style" => {
            let css = sanitize_custom_css(value);
            (!css.is_empty()).then(|| css.as_str().to_owned())
        }
        _ => Some(value.to_owned()),
    }
}

fn is_plain_attr_name(attr: &str) -> bool {
    !attr.is_empty()
        && attr
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Relative URLs and `http`, `https`, `mailto`, `tel` are safe.
///
/// Whitespace and control characters are ignored when looking for the
/// scheme, the same way browsers ignore them.
pub(crate) fn is_safe_url(value: &str) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();

    let scheme_end = cleaned.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if cleaned[i..].starts_with(':') => {
            let scheme = cleaned[..i].to_ascii_lowercase();
            SAFE_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}
