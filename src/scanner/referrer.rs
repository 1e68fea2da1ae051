//! Referrer-Policy evaluation.
//!
//! Considers the `Referrer-Policy` header and `<meta name="referrer">`. As
//! in browsers, the last delivered policy wins, and within a comma-separated
//! fallback list the last recognized token is the effective one.

use scraper::{Html, Selector};
use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

const PRIVATE: &[&str] = &[
    "no-referrer",
    "same-origin",
    "strict-origin",
    "strict-origin-when-cross-origin",
];

const UNSAFE: &[&str] = &["origin", "origin-when-cross-origin", "unsafe-url"];

/// The referrer-policy evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::ReferrerPolicyPrivate;

    let mut delivered: Vec<String> = requests
        .headers
        .all("referrer-policy")
        .iter()
        .cloned()
        .collect();
    if requests.is_html() {
        delivered.extend(extract_meta_referrer(&requests.body));
    }

    let (result, effective) = classify(&delivered);

    let data = json!({
        "delivered": delivered,
        "effective": effective,
    });
    TestResult::build("referrer-policy", expectation, result, data, None)
}

fn classify(delivered: &[String]) -> (Outcome, Option<String>) {
    if delivered.is_empty() {
        return (Outcome::ReferrerPolicyNotImplemented, None);
    }

    // Last policy wins; within it, the last recognized fallback token wins.
    let last = delivered.last().expect("checked non-empty");
    let effective = last
        .split(',')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| is_recognized(token))
        .next_back();

    match effective {
        None => (Outcome::ReferrerPolicyHeaderInvalid, None),
        Some(token) => {
            let outcome = if PRIVATE.contains(&token.as_str()) {
                Outcome::ReferrerPolicyPrivate
            } else if token == "no-referrer-when-downgrade" {
                Outcome::ReferrerPolicyNoReferrerWhenDowngrade
            } else {
                Outcome::ReferrerPolicyUnsafe
            };
            (outcome, Some(token))
        }
    }
}

fn is_recognized(token: &str) -> bool {
    PRIVATE.contains(&token) || UNSAFE.contains(&token) || token == "no-referrer-when-downgrade"
}

fn extract_meta_referrer(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = match Selector::parse("meta[name]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };
    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("name")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("referrer"))
        })
        .filter_map(|el| el.value().attr("content"))
        .map(str::to_string)
        .collect()
}
