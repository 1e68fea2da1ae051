//! Simple header tests: X-Content-Type-Options, X-Frame-Options, and
//! Cross-Origin-Resource-Policy.

use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{csp, Outcome, TestResult};

/// The x-content-type-options evaluator.
pub fn evaluate_xcto(requests: &Requests) -> TestResult {
    let header = requests.headers.first("x-content-type-options");
    let result = match header {
        None => Outcome::XContentTypeOptionsNotImplemented,
        Some(value) if value.trim().eq_ignore_ascii_case("nosniff") => {
            Outcome::XContentTypeOptionsNosniff
        }
        Some(_) => Outcome::XContentTypeOptionsHeaderInvalid,
    };

    TestResult::build(
        "x-content-type-options",
        Outcome::XContentTypeOptionsNosniff,
        result,
        json!({ "header": header }),
        None,
    )
}

/// The x-frame-options evaluator.
///
/// A CSP `frame-ancestors` directive supersedes the header in every modern
/// browser, so its presence satisfies the test on its own.
pub fn evaluate_xfo(requests: &Requests) -> TestResult {
    let expectation = Outcome::XFrameOptionsSameoriginOrDeny;
    let frame_ancestors = csp::header_frame_ancestors(requests);
    let header = requests.headers.first("x-frame-options");

    let result = if frame_ancestors.is_some() {
        Outcome::XFrameOptionsImplementedViaCsp
    } else {
        match header {
            None => Outcome::XFrameOptionsNotImplemented,
            Some(value) => {
                let value = value.trim().to_ascii_uppercase();
                if value == "DENY" || value == "SAMEORIGIN" {
                    Outcome::XFrameOptionsSameoriginOrDeny
                } else if value.starts_with("ALLOW-FROM") {
                    Outcome::XFrameOptionsAllowFromOrigin
                } else {
                    Outcome::XFrameOptionsHeaderInvalid
                }
            }
        }
    };

    let data = json!({
        "header": header,
        "frameAncestors": frame_ancestors,
    });
    TestResult::build("x-frame-options", expectation, result, data, None)
}

const CORP_VALUES: &[(&str, Outcome)] = &[
    ("same-origin", Outcome::CorpImplementedWithSameOrigin),
    ("same-site", Outcome::CorpImplementedWithSameSite),
    ("cross-origin", Outcome::CorpImplementedWithCrossOrigin),
];

/// The cross-origin-resource-policy evaluator.
pub fn evaluate_corp(requests: &Requests) -> TestResult {
    let header = requests.headers.first("cross-origin-resource-policy");
    let result = match header {
        None => Outcome::CorpNotImplemented,
        Some(value) => {
            let value = value.trim().to_ascii_lowercase();
            CORP_VALUES
                .iter()
                .find(|(name, _)| *name == value)
                .map(|(_, outcome)| *outcome)
                .unwrap_or(Outcome::CorpHeaderInvalid)
        }
    };

    TestResult::build(
        "cross-origin-resource-policy",
        Outcome::CorpNotImplemented,
        result,
        json!({ "header": header }),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::requests_with_headers;

    #[test]
    fn test_xcto_nosniff() {
        let result = evaluate_xcto(&requests_with_headers(&[(
            "x-content-type-options",
            "nosniff",
        )]));
        assert_eq!(result.result, Outcome::XContentTypeOptionsNosniff);
        assert!(result.pass);

        // Value matching is case-insensitive with surrounding whitespace.
        let result = evaluate_xcto(&requests_with_headers(&[(
            "x-content-type-options",
            " NoSniff ",
        )]));
        assert!(result.pass);
    }

    #[test]
    fn test_xcto_missing_and_invalid() {
        let result = evaluate_xcto(&requests_with_headers(&[]));
        assert_eq!(result.result, Outcome::XContentTypeOptionsNotImplemented);
        assert_eq!(result.score_modifier, -5);

        let result = evaluate_xcto(&requests_with_headers(&[(
            "x-content-type-options",
            "sniff-away",
        )]));
        assert_eq!(result.result, Outcome::XContentTypeOptionsHeaderInvalid);
    }

    #[test]
    fn test_xfo_deny_and_sameorigin() {
        for value in ["DENY", "deny", "SAMEORIGIN", "sameorigin"] {
            let result = evaluate_xfo(&requests_with_headers(&[("x-frame-options", value)]));
            assert_eq!(result.result, Outcome::XFrameOptionsSameoriginOrDeny, "{value}");
            assert!(result.pass);
        }
    }

    #[test]
    fn test_xfo_allow_from() {
        let result = evaluate_xfo(&requests_with_headers(&[(
            "x-frame-options",
            "ALLOW-FROM https://parent.example.test",
        )]));
        assert_eq!(result.result, Outcome::XFrameOptionsAllowFromOrigin);
        assert!(result.pass);
    }

    #[test]
    fn test_xfo_missing_and_invalid() {
        let result = evaluate_xfo(&requests_with_headers(&[]));
        assert_eq!(result.result, Outcome::XFrameOptionsNotImplemented);
        assert_eq!(result.score_modifier, -20);

        let result = evaluate_xfo(&requests_with_headers(&[("x-frame-options", "ALLOWALL")]));
        assert_eq!(result.result, Outcome::XFrameOptionsHeaderInvalid);
    }

    #[test]
    fn test_xfo_satisfied_by_csp_frame_ancestors() {
        let result = evaluate_xfo(&requests_with_headers(&[(
            "content-security-policy",
            "default-src 'self'; frame-ancestors 'none'",
        )]));
        assert_eq!(result.result, Outcome::XFrameOptionsImplementedViaCsp);
        assert!(result.pass);
        assert_eq!(result.data["frameAncestors"][0], "'none'");
    }

    #[test]
    fn test_corp_values() {
        for (value, expected) in [
            ("same-origin", Outcome::CorpImplementedWithSameOrigin),
            ("Same-Site", Outcome::CorpImplementedWithSameSite),
            ("cross-origin", Outcome::CorpImplementedWithCrossOrigin),
        ] {
            let result = evaluate_corp(&requests_with_headers(&[(
                "cross-origin-resource-policy",
                value,
            )]));
            assert_eq!(result.result, expected, "{value}");
            assert!(result.pass);
        }
    }

    #[test]
    fn test_corp_missing_and_invalid() {
        let result = evaluate_corp(&requests_with_headers(&[]));
        assert_eq!(result.result, Outcome::CorpNotImplemented);
        assert!(result.pass);

        let result = evaluate_corp(&requests_with_headers(&[(
            "cross-origin-resource-policy",
            "everyone",
        )]));
        assert_eq!(result.result, Outcome::CorpHeaderInvalid);
        assert!(!result.pass);
    }
}
