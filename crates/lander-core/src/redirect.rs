//! Post-submission redirect validation.
//!
//! A redirect target is accepted only if it stays on the site's own origin.
//! Path-relative targets are accepted directly; everything else is resolved
//! against the origin and compared.

use url::Url;

use crate::error::RedirectRejected;

const DENIED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:", "file:"];

/// Check `url` against `origin`, explaining any rejection.
///
/// # Errors
///
/// Returns [`RedirectRejected`] when the target uses a script-capable or
/// local scheme, contains control characters, is protocol-relative, cannot
/// be parsed, or resolves to a different origin.
pub fn check_redirect_url(url: &str, origin: &Url) -> Result<(), RedirectRejected> {
    let reject = |reason: &'static str| RedirectRejected {
        url: url.to_owned(),
        reason,
    };

    let target = url.trim();
    if target.is_empty() {
        return Err(reject("empty target"));
    }

    // Browsers ignore embedded tabs and newlines when reading the scheme.
    let compact: String = target
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    if DENIED_SCHEMES.iter().any(|s| compact.starts_with(s)) {
        return Err(reject("script-capable or local scheme"));
    }
    if target.chars().any(char::is_control) {
        return Err(reject("control characters in target"));
    }

    if let Some(rest) = compact.strip_prefix('/') {
        if rest.starts_with('/') || rest.starts_with('\\') {
            return Err(reject("protocol-relative target"));
        }
        return Ok(());
    }

    let resolved = origin
        .join(target)
        .map_err(|_| reject("not a valid URL"))?;
    if resolved.origin() == origin.origin() {
        Ok(())
    } else {
        Err(reject("different origin"))
    }
}

/// Whether `url` is a safe same-origin redirect target.
#[must_use]
pub fn validate_redirect_url(url: &str, origin: &Url) -> bool {
    check_redirect_url(url, origin).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn relative_path_is_accepted() {
        assert!(validate_redirect_url("/gracias", &origin()));
        assert!(validate_redirect_url("  /thanks?ref=lp#top ", &origin()));
    }

    #[test]
    fn same_origin_absolute_is_accepted() {
        assert!(validate_redirect_url("https://example.com/thanks", &origin()));
        assert!(validate_redirect_url("thanks", &origin()));
    }

    #[test]
    fn other_origin_is_rejected() {
        assert!(!validate_redirect_url("https://otherdomain.com/x", &origin()));
        assert!(!validate_redirect_url("http://example.com/thanks", &origin()));
        assert!(!validate_redirect_url("https://example.com:8443/", &origin()));
        assert!(!validate_redirect_url("https://example.com.evil.test/", &origin()));
    }

    #[test]
    fn dangerous_schemes_are_rejected() {
        for url in [
            "javascript:alert(1)",
            "JaVaScRiPt:alert(1)",
            "  javascript:alert(1)",
            "java\tscript:alert(1)",
            "data:text/html,<script>alert(1)</script>",
            "vbscript:msgbox(1)",
            "file:///etc/passwd",
        ] {
            let err = check_redirect_url(url, &origin()).unwrap_err();
            assert_eq!(err.reason, "script-capable or local scheme", "{url}");
        }
    }

    #[test]
    fn protocol_relative_is_rejected() {
        assert!(!validate_redirect_url("//evil.com", &origin()));
        assert!(!validate_redirect_url("/\\evil.com", &origin()));
        assert!(!validate_redirect_url(" //evil.com/path", &origin()));
    }

    #[test]
    fn embedded_control_characters_are_rejected() {
        for url in ["/gra\ncias", "/thanks\r\nSet-Cookie: x=1", "/a\tb", "https://example.com/\u{7f}"] {
            let err = check_redirect_url(url, &origin()).unwrap_err();
            assert_eq!(err.reason, "control characters in target", "{url:?}");
        }
        assert!(validate_redirect_url("/gracias\n", &origin()));
    }

    #[test]
    fn empty_is_rejected() {
        let err = check_redirect_url("   ", &origin()).unwrap_err();
        assert_eq!(err.reason, "empty target");
    }

    #[test]
    fn rejection_carries_target() {
        let err = check_redirect_url("https://otherdomain.com", &origin()).unwrap_err();
        assert_eq!(err.url, "https://otherdomain.com");
        assert!(err.to_string().contains("different origin"));
    }
}
