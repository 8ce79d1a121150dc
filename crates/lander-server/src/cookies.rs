//! Visitor and session identification cookies.
//!
//! `lander_vid` identifies a browser for a year; `lander_sid` lives for the
//! browser session. Both are minted as UUID v4 when missing or malformed and
//! are never readable from page scripts.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use lander_core::Visitor;
use uuid::Uuid;

pub const VISITOR_COOKIE: &str = "lander_vid";
pub const SESSION_COOKIE: &str = "lander_sid";

const VISITOR_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;
const MAX_ID_LEN: usize = 64;

/// The visitor behind a request, plus any cookies that must be (re)issued.
#[derive(Debug, Clone)]
pub struct VisitorIdentity {
    pub visitor: Visitor,
    pub set_cookies: Vec<HeaderValue>,
}

impl VisitorIdentity {
    /// Read the identity cookies from `headers`, minting whatever is missing.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, secure: bool) -> Self {
        let mut visitor_id = None;
        let mut session_id = None;

        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            for (name, value) in parse_cookie_header(raw) {
                match name {
                    VISITOR_COOKIE if is_valid_id(value) => visitor_id = Some(value.to_owned()),
                    SESSION_COOKIE if is_valid_id(value) => session_id = Some(value.to_owned()),
                    _ => {}
                }
            }
        }

        let mut set_cookies = Vec::new();
        let visitor_id = visitor_id.unwrap_or_else(|| {
            let id = Uuid::new_v4().to_string();
            set_cookies.extend(cookie(VISITOR_COOKIE, &id, Some(VISITOR_MAX_AGE_SECS), secure));
            id
        });
        let session_id = session_id.unwrap_or_else(|| {
            let id = Uuid::new_v4().to_string();
            set_cookies.extend(cookie(SESSION_COOKIE, &id, None, secure));
            id
        });

        Self {
            visitor: Visitor::new(visitor_id, session_id),
            set_cookies,
        }
    }

    /// Append the pending `Set-Cookie` headers to a response's headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for value in &self.set_cookies {
            headers.append(SET_COOKIE, value.clone());
        }
    }
}

/// Split a `Cookie` request header into `(name, value)` pairs.
///
/// Pairs without `=` or with an empty name are skipped.
fn parse_cookie_header(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        (!name.is_empty()).then(|| (name, value.trim().trim_matches('"')))
    })
}

fn is_valid_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn cookie(name: &str, value: &str, max_age: Option<u64>, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(secs) = max_age {
        cookie.push_str(&format!("; Max-Age={secs}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn parses_cookie_pairs() {
        let pairs: Vec<_> = parse_cookie_header("a=1; b = two ;c=\"3\"; junk; =x").collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "two"), ("c", "3")]);
    }

    #[test]
    fn existing_ids_are_reused() {
        let id = VisitorIdentity::from_headers(
            &headers("theme=dark; lander_vid=abc-123; lander_sid=sess-9"),
            false,
        );
        assert_eq!(id.visitor.visitor_id, "abc-123");
        assert_eq!(id.visitor.session_id, "sess-9");
        assert!(id.set_cookies.is_empty());
    }

    #[test]
    fn missing_ids_are_minted() {
        let id = VisitorIdentity::from_headers(&HeaderMap::new(), false);
        assert!(Uuid::parse_str(&id.visitor.visitor_id).is_ok());
        assert!(Uuid::parse_str(&id.visitor.session_id).is_ok());
        assert_eq!(id.set_cookies.len(), 2);

        let vid = id.set_cookies[0].to_str().unwrap();
        assert!(vid.starts_with("lander_vid="));
        assert!(vid.contains("HttpOnly"));
        assert!(vid.contains("SameSite=Lax"));
        assert!(vid.contains("Max-Age=31536000"));
        assert!(!vid.contains("Secure"));

        let sid = id.set_cookies[1].to_str().unwrap();
        assert!(sid.starts_with("lander_sid="));
        assert!(!sid.contains("Max-Age"));
    }

    #[test]
    fn malformed_ids_are_replaced() {
        let id = VisitorIdentity::from_headers(&headers("lander_vid=<script>; lander_sid=ok"), true);
        assert_ne!(id.visitor.visitor_id, "<script>");
        assert_eq!(id.visitor.session_id, "ok");
        assert_eq!(id.set_cookies.len(), 1);
        assert!(id.set_cookies[0].to_str().unwrap().ends_with("; Secure"));
    }
}
