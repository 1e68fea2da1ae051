//! Strict-Transport-Security evaluation.
//!
//! The header only counts on the HTTPS final response; preload-list
//! membership satisfies the test regardless of the header, since preloaded
//! domains are committed browser-side.

use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

/// Minimum acceptable max-age: six months, in seconds.
pub const SIX_MONTHS_SECS: i64 = 15_552_000;

#[derive(Debug, Default)]
struct HstsDirectives {
    max_age: Option<i64>,
    include_subdomains: bool,
    preload: bool,
}

/// The strict-transport-security evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::HstsImplementedMaxAgeAtLeastSixMonths;
    let header = requests.headers.first("strict-transport-security");

    let (result, directives) = classify(requests, header);

    let data = json!({
        "header": header,
        "maxAge": directives.as_ref().and_then(|d| d.max_age),
        "includeSubDomains": directives.as_ref().map(|d| d.include_subdomains),
        "preloadDirective": directives.as_ref().map(|d| d.preload),
        "preloaded": requests.hsts_preload.preloaded,
        "preloadEntry": requests.hsts_preload.entry,
    });
    TestResult::build("strict-transport-security", expectation, result, data, None)
}

fn classify(requests: &Requests, header: Option<&str>) -> (Outcome, Option<HstsDirectives>) {
    if requests.hsts_preload.preloaded {
        return (Outcome::HstsPreloaded, header.and_then(parse_directives));
    }
    if !requests.is_https() {
        return (Outcome::HstsNotImplementedNoHttps, None);
    }

    let Some(header) = header else {
        return (Outcome::HstsNotImplemented, None);
    };

    match parse_directives(header) {
        None => (Outcome::HstsHeaderInvalid, None),
        Some(directives) => {
            let outcome = match directives.max_age {
                Some(age) if age >= SIX_MONTHS_SECS => {
                    Outcome::HstsImplementedMaxAgeAtLeastSixMonths
                }
                Some(_) => Outcome::HstsImplementedMaxAgeLessThanSixMonths,
                None => Outcome::HstsHeaderInvalid,
            };
            (outcome, Some(directives))
        }
    }
}

/// Parses the directive list. Returns `None` when the header is not even
/// directive-shaped; a missing max-age surfaces later as invalid.
fn parse_directives(header: &str) -> Option<HstsDirectives> {
    let mut directives = HstsDirectives::default();
    let mut any = false;

    for part in header.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        any = true;
        let (name, value) = match part.find('=') {
            Some(idx) => (part[..idx].trim(), Some(part[idx + 1..].trim())),
            None => (part, None),
        };
        if name.eq_ignore_ascii_case("max-age") {
            let raw = value?.trim_matches('"');
            directives.max_age = Some(raw.parse().ok()?);
        } else if name.eq_ignore_ascii_case("includesubdomains") {
            directives.include_subdomains = true;
        } else if name.eq_ignore_ascii_case("preload") {
            directives.preload = true;
        }
    }

    any.then_some(directives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{requests_with_headers, RequestsBuilder};

    #[test]
    fn test_two_year_max_age_passes() {
        let result = evaluate(&requests_with_headers(&[(
            "strict-transport-security",
            "max-age=63072000; includeSubDomains; preload",
        )]));
        assert_eq!(result.result, Outcome::HstsImplementedMaxAgeAtLeastSixMonths);
        assert!(result.pass);
        assert_eq!(result.data["maxAge"], 63072000);
        assert_eq!(result.data["includeSubDomains"], true);
    }

    #[test]
    fn test_exactly_six_months_passes() {
        let result = evaluate(&requests_with_headers(&[(
            "strict-transport-security",
            "max-age=15552000",
        )]));
        assert_eq!(result.result, Outcome::HstsImplementedMaxAgeAtLeastSixMonths);
    }

    #[test]
    fn test_short_max_age_fails() {
        let result = evaluate(&requests_with_headers(&[(
            "strict-transport-security",
            "max-age=86400",
        )]));
        assert_eq!(result.result, Outcome::HstsImplementedMaxAgeLessThanSixMonths);
        assert!(!result.pass);
        assert_eq!(result.score_modifier, -10);
    }

    #[test]
    fn test_missing_header_fails() {
        let result = evaluate(&requests_with_headers(&[]));
        assert_eq!(result.result, Outcome::HstsNotImplemented);
        assert_eq!(result.score_modifier, -20);
    }

    #[test]
    fn test_invalid_headers() {
        for bad in ["max-age=soon", "includeSubDomains", "max-age="] {
            let result = evaluate(&requests_with_headers(&[("strict-transport-security", bad)]));
            assert_eq!(result.result, Outcome::HstsHeaderInvalid, "{bad}");
        }
    }

    #[test]
    fn test_preloaded_domain_passes_without_header() {
        let requests = RequestsBuilder::new("example.test")
            .preloaded("example.test")
            .build();
        let result = evaluate(&requests);
        assert_eq!(result.result, Outcome::HstsPreloaded);
        assert!(result.pass);
        assert_eq!(result.data["preloadEntry"], "example.test");
    }

    #[test]
    fn test_http_only_site_cannot_implement_hsts() {
        let requests = RequestsBuilder::new("example.test")
            .final_url("http://example.test/")
            .build();
        let result = evaluate(&requests);
        assert_eq!(result.result, Outcome::HstsNotImplementedNoHttps);
        assert!(!result.pass);
    }
}
