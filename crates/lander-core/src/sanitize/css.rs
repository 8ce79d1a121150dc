//! Custom CSS neutralization.
//!
//! This is pattern matching, not a CSS parser. Known injection vectors are
//! rewritten to an inert comment so the stylesheet still parses:
//!
//! 1. `expression(`
//! 2. `javascript:`
//! 3. `vbscript:`
//! 4. `@import ...;`
//! 5. `url(data:...)`
//! 6. `-moz-binding:`
//! 7. `behavior:`
//!
//! Before matching, comments are removed and CSS escapes that spell letters
//! or the punctuation the patterns rely on are decoded, so `expr/**/ession(`
//! and `\6a avascript:` are caught. Finally `<` is escaped so the result can
//! never close the `<style>` element it is embedded in.
//!
//! Residual risk: there is no property/value allow-list. A vector that is not
//! in the list above passes through unchanged. Pages are also served with a
//! `script-src 'none'` content security policy.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Inert replacement for every blocked construct.
pub const BLOCKED_MARKER: &str = "/* blocked */";

/// CSS that has been through [`sanitize_custom_css`].
///
/// Only this module can construct it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeCss(String);

impl SafeCss {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SafeCss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("CSS sanitizer pattern is a valid literal regex")
}

static COMMENT: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?s)/\*.*?(?:\*/|\z)"));
static HEX_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\\([0-9A-Fa-f]{1,6})(?:\r\n|[ \t\r\n\x0C])?"));
static LETTER_ESCAPE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\\([A-Za-z])"));

/// Ordered neutralizations. Each entry is `(pattern, replacement)`.
static NEUTRALIZERS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    vec![
        (pattern(r"(?i)expression\s*\("), format!("{BLOCKED_MARKER}(")),
        (pattern(r"(?i)javascript\s*:"), BLOCKED_MARKER.to_owned()),
        (pattern(r"(?i)vbscript\s*:"), BLOCKED_MARKER.to_owned()),
        (pattern(r"(?i)@import[^;{}]*;?"), BLOCKED_MARKER.to_owned()),
        (
            pattern(r#"(?i)url\s*\(\s*['"]?\s*data:[^)]*\)"#),
            BLOCKED_MARKER.to_owned(),
        ),
        (pattern(r"(?i)-moz-binding\s*:"), BLOCKED_MARKER.to_owned()),
        // `scroll-behavior:` is a legitimate property.
        (
            pattern(r"(?i)(^|[^-\w])behavior\s*:"),
            format!("${{1}}{BLOCKED_MARKER}"),
        ),
    ]
});

/// Neutralize known injection vectors in author-supplied CSS.
///
/// Never fails. Selectors and braces are preserved, so the output is still
/// parseable CSS.
#[must_use]
pub fn sanitize_custom_css(css: &str) -> SafeCss {
    let mut out = COMMENT.replace_all(css, "").into_owned();
    out = decode_escapes(&out);

    for (re, replacement) in NEUTRALIZERS.iter() {
        out = re.replace_all(&out, replacement.as_str()).into_owned();
    }

    SafeCss(out.replace('<', "\\3c "))
}

/// Decode the CSS escapes an attacker would use to hide a keyword.
///
/// Hex escapes are decoded only when they yield an ASCII alphanumeric or one
/// of `( : - @ ;`. Anything else stays escaped so string contents and
/// structure are unchanged.
fn decode_escapes(css: &str) -> String {
    let decoded = HEX_ESCAPE.replace_all(css, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '(' | ':' | '-' | '@' | ';'))
            .map_or_else(|| caps[0].to_owned(), String::from)
    });
    LETTER_ESCAPE.replace_all(&decoded, "$1").into_owned()
}
