//! Subresource-integrity evaluation.
//!
//! Inspects `<script src>` elements of the delivered HTML (bounded body
//! only): their origin relative to the final URL, the scheme they load
//! over, and their `integrity` attribute. Same-origin scripts do not need
//! SRI; external ones should carry it and load over HTTPS.

use reqwest::Url;
use scraper::{Html, Selector};
use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

#[derive(Debug)]
struct ScriptRef {
    src: String,
    resolved: Option<Url>,
    same_origin: bool,
    secure: bool,
    integrity: bool,
}

/// The subresource-integrity evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::SriImplementedAndExternalScriptsLoadedSecurely;

    if requests.headers.first("content-type").is_some() && !requests.is_html() {
        return TestResult::build(
            "subresource-integrity",
            expectation,
            Outcome::SriNotImplementedResponseNotHtml,
            json!({ "scripts": [] }),
            None,
        );
    }

    let scripts = collect_scripts(requests);
    let result = classify(&scripts);

    let data = json!({
        "scripts": scripts
            .iter()
            .map(|s| json!({
                "src": s.src,
                "resolved": s.resolved.as_ref().map(Url::as_str),
                "sameOrigin": s.same_origin,
                "secure": s.secure,
                "integrity": s.integrity,
            }))
            .collect::<Vec<_>>(),
    });
    TestResult::build("subresource-integrity", expectation, result, data, None)
}

fn classify(scripts: &[ScriptRef]) -> Outcome {
    if scripts.is_empty() {
        return Outcome::SriNotImplementedButNoScriptsLoaded;
    }

    let externals: Vec<&ScriptRef> = scripts.iter().filter(|s| !s.same_origin).collect();
    let all_integrity = scripts.iter().all(|s| s.integrity);

    if externals.is_empty() {
        return if all_integrity {
            Outcome::SriImplementedAndAllScriptsLoadedSecurely
        } else {
            Outcome::SriNotImplementedButAllScriptsLoadedFromSecureOrigin
        };
    }

    let externals_secure = externals.iter().all(|s| s.secure);
    let externals_integrity = externals.iter().all(|s| s.integrity);
    let any_integrity = scripts.iter().any(|s| s.integrity);

    if !externals_secure {
        return if any_integrity {
            Outcome::SriImplementedButExternalScriptsNotLoadedSecurely
        } else {
            Outcome::SriNotImplementedAndExternalScriptsNotLoadedSecurely
        };
    }

    if externals_integrity {
        if all_integrity {
            Outcome::SriImplementedAndAllScriptsLoadedSecurely
        } else {
            Outcome::SriImplementedAndExternalScriptsLoadedSecurely
        }
    } else {
        Outcome::SriNotImplementedButExternalScriptsLoadedSecurely
    }
}

fn collect_scripts(requests: &Requests) -> Vec<ScriptRef> {
    let document = Html::parse_document(&requests.body);
    let selector = match Selector::parse("script[src]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("src").map(|src| (el, src)))
        .map(|(el, src)| {
            let resolved = requests.final_url.join(src).ok();
            let same_origin = resolved
                .as_ref()
                .is_some_and(|u| u.origin() == requests.final_url.origin());
            let secure = resolved.as_ref().is_some_and(|u| u.scheme() == "https");
            let integrity = el
                .value()
                .attr("integrity")
                .is_some_and(|v| !v.trim().is_empty());
            ScriptRef {
                src: src.to_string(),
                resolved,
                same_origin,
                secure,
                integrity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::RequestsBuilder;

    fn requests_with_body(body: &str) -> Requests {
        RequestsBuilder::new("example.test").body(body).build()
    }

    #[test]
    fn test_no_scripts_passes() {
        let result = evaluate(&requests_with_body("<html><body>static</body></html>"));
        assert_eq!(result.result, Outcome::SriNotImplementedButNoScriptsLoaded);
        assert!(result.pass);
    }

    #[test]
    fn test_non_html_response_passes() {
        let requests = RequestsBuilder::new("example.test")
            .headers(&[("content-type", "application/json")])
            .body("{}")
            .build();
        let result = evaluate(&requests);
        assert_eq!(result.result, Outcome::SriNotImplementedResponseNotHtml);
        assert!(result.pass);
    }

    #[test]
    fn test_same_origin_scripts_without_sri_pass() {
        let result = evaluate(&requests_with_body(
            "<script src=\"/app.js\"></script><script src=\"https://example.test/vendor.js\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriNotImplementedButAllScriptsLoadedFromSecureOrigin
        );
        assert!(result.pass);
    }

    #[test]
    fn test_external_scripts_with_sri_over_https_pass() {
        let result = evaluate(&requests_with_body(
            "<script src=\"https://cdn.example.net/lib.js\" integrity=\"sha384-abc\"></script>\
             <script src=\"/app.js\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriImplementedAndExternalScriptsLoadedSecurely
        );
        assert!(result.pass);
    }

    #[test]
    fn test_every_script_with_sri() {
        let result = evaluate(&requests_with_body(
            "<script src=\"https://cdn.example.net/lib.js\" integrity=\"sha384-abc\"></script>\
             <script src=\"/app.js\" integrity=\"sha384-def\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriImplementedAndAllScriptsLoadedSecurely
        );
    }

    #[test]
    fn test_external_script_without_sri_over_https() {
        let result = evaluate(&requests_with_body(
            "<script src=\"https://cdn.example.net/lib.js\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriNotImplementedButExternalScriptsLoadedSecurely
        );
        assert_eq!(result.score_modifier, -5);
    }

    #[test]
    fn test_external_script_over_http_without_sri() {
        let result = evaluate(&requests_with_body(
            "<script src=\"http://cdn.example.net/lib.js\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriNotImplementedAndExternalScriptsNotLoadedSecurely
        );
        assert_eq!(result.score_modifier, -50);
    }

    #[test]
    fn test_external_script_over_http_with_sri_elsewhere() {
        let result = evaluate(&requests_with_body(
            "<script src=\"http://cdn.example.net/a.js\"></script>\
             <script src=\"https://cdn.example.net/b.js\" integrity=\"sha384-abc\"></script>",
        ));
        assert_eq!(
            result.result,
            Outcome::SriImplementedButExternalScriptsNotLoadedSecurely
        );
        assert_eq!(result.score_modifier, -20);
    }

    #[test]
    fn test_protocol_relative_src_inherits_page_scheme() {
        let result = evaluate(&requests_with_body(
            "<script src=\"//cdn.example.net/lib.js\" integrity=\"sha256-x\"></script>",
        ));
        // Page is https, so the script resolves to https and is secure.
        assert_eq!(
            result.result,
            Outcome::SriImplementedAndExternalScriptsLoadedSecurely
        );
    }

    #[test]
    fn test_data_lists_script_origins() {
        let result = evaluate(&requests_with_body(
            "<script src=\"https://cdn.example.net/lib.js\" integrity=\"sha384-abc\"></script>",
        ));
        assert_eq!(result.data["scripts"][0]["sameOrigin"], false);
        assert_eq!(result.data["scripts"][0]["integrity"], true);
    }
}
