//! Set-Cookie capture along the redirect chain.
//!
//! Cookies are modeled as a list, not a keyed map: the same cookie name may
//! be set multiple times along the chain, and each observation records the
//! scheme and host of the hop that emitted it.

use serde::Serialize;

use super::Scheme;

/// One `Set-Cookie` observation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedCookie {
    /// Cookie name.
    pub name: String,
    /// Whether the `Secure` attribute was present.
    pub secure: bool,
    /// Whether the `HttpOnly` attribute was present.
    pub http_only: bool,
    /// Raw `SameSite` value, if the attribute was present.
    pub same_site: Option<String>,
    /// `Path` attribute, if present.
    pub path: Option<String>,
    /// `Domain` attribute, if present.
    pub domain: Option<String>,
    /// Raw `Expires` attribute, if present.
    pub expires: Option<String>,
    /// `Max-Age` attribute, if present and numeric.
    pub max_age: Option<i64>,
    /// Scheme of the hop that emitted the cookie.
    pub set_on_scheme: Scheme,
    /// Host of the hop that emitted the cookie.
    pub set_on_host: String,
}

/// Parses one `Set-Cookie` header value.
///
/// Returns `None` for values without a `name=value` pair. Attribute names are
/// matched case-insensitively; unknown attributes are ignored.
pub fn parse_set_cookie(raw: &str, scheme: Scheme, host: &str) -> Option<ObservedCookie> {
    let mut parts = raw.split(';');

    let pair = parts.next()?.trim();
    let eq = pair.find('=')?;
    let name = pair[..eq].trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = ObservedCookie {
        name: name.to_string(),
        secure: false,
        http_only: false,
        same_site: None,
        path: None,
        domain: None,
        expires: None,
        max_age: None,
        set_on_scheme: scheme,
        set_on_host: host.to_string(),
    };

    for part in parts {
        let part = part.trim();
        let (attr, value) = match part.find('=') {
            Some(idx) => (part[..idx].trim(), Some(part[idx + 1..].trim())),
            None => (part, None),
        };
        if attr.eq_ignore_ascii_case("secure") {
            cookie.secure = true;
        } else if attr.eq_ignore_ascii_case("httponly") {
            cookie.http_only = true;
        } else if attr.eq_ignore_ascii_case("samesite") {
            cookie.same_site = value.map(str::to_string);
        } else if attr.eq_ignore_ascii_case("path") {
            cookie.path = value.map(str::to_string);
        } else if attr.eq_ignore_ascii_case("domain") {
            cookie.domain = value.map(str::to_string);
        } else if attr.eq_ignore_ascii_case("expires") {
            cookie.expires = value.map(str::to_string);
        } else if attr.eq_ignore_ascii_case("max-age") {
            cookie.max_age = value.and_then(|v| v.parse().ok());
        }
    }

    Some(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_attribute_set() {
        let cookie = parse_set_cookie(
            "SESSIONID=abc123; Secure; HttpOnly; SameSite=Strict; Path=/; Domain=example.com; Max-Age=3600",
            Scheme::Https,
            "example.com",
        )
        .unwrap();
        assert_eq!(cookie.name, "SESSIONID");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Strict"));
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert_eq!(cookie.max_age, Some(3600));
        assert_eq!(cookie.set_on_scheme, Scheme::Https);
    }

    #[test]
    fn test_parse_attributes_case_insensitive() {
        let cookie =
            parse_set_cookie("a=b; SECURE; httponly; samesite=lax", Scheme::Http, "h.test").unwrap();
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("lax"));
        assert_eq!(cookie.set_on_scheme, Scheme::Http);
    }

    #[test]
    fn test_parse_bare_flags_default_off() {
        let cookie = parse_set_cookie("plain=1", Scheme::Https, "h.test").unwrap();
        assert!(!cookie.secure);
        assert!(!cookie.http_only);
        assert!(cookie.same_site.is_none());
    }

    #[test]
    fn test_parse_rejects_nameless_values() {
        assert!(parse_set_cookie("", Scheme::Https, "h.test").is_none());
        assert!(parse_set_cookie("no-equals-sign", Scheme::Https, "h.test").is_none());
        assert!(parse_set_cookie("=value-only", Scheme::Https, "h.test").is_none());
    }
}
