//! Cookie evaluation.
//!
//! Walks every cookie captured across the redirect chain. Session cookies
//! (recognized by name) are graded more strictly: they must carry both
//! `Secure` and `HttpOnly`. Any cookie on the site must be `Secure`, and a
//! missing or invalid `SameSite` is a distinct, milder failure. When several
//! violations apply, the most severe one becomes the result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::retriever::{ObservedCookie, Requests};
use crate::scanner::{Outcome, TestResult};

/// Name patterns marking a cookie as a session or auth token carrier.
static SESSION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(session|sessid|^sid$|auth|csrf|xsrf)").expect("static regex"));

/// Whether a cookie name matches the session-cookie heuristics.
pub fn is_session_cookie(name: &str) -> bool {
    SESSION_NAME.is_match(name)
}

const VALID_SAMESITE: &[&str] = &["strict", "lax", "none"];

/// The cookies evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::CookiesSecureWithHttponlySessions;

    if requests.cookies.is_empty() {
        return TestResult::build(
            "cookies",
            expectation,
            Outcome::CookiesNotFound,
            json!({ "cookies": [] }),
            None,
        );
    }

    let mut violations: Vec<Outcome> = Vec::new();

    for cookie in &requests.cookies {
        if !cookie.secure {
            violations.push(Outcome::CookiesWithoutSecureFlag);
        }
        if is_session_cookie(&cookie.name) && cookie.secure && !cookie.http_only {
            violations.push(Outcome::CookiesSessionWithoutHttponlyFlag);
        }
        match &cookie.same_site {
            None => violations.push(Outcome::CookiesWithoutSamesiteFlag),
            Some(value) => {
                if !VALID_SAMESITE.contains(&value.to_ascii_lowercase().as_str()) {
                    violations.push(Outcome::CookiesSamesiteFlagInvalid);
                }
            }
        }
    }

    let result = violations
        .into_iter()
        .min_by_key(|o| o.score_modifier())
        .unwrap_or(Outcome::CookiesSecureWithHttponlySessions);

    let data = json!({ "cookies": cookie_summaries(&requests.cookies) });
    TestResult::build("cookies", expectation, result, data, None)
}

fn cookie_summaries(cookies: &[ObservedCookie]) -> Vec<serde_json::Value> {
    cookies
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "secure": c.secure,
                "httpOnly": c.http_only,
                "sameSite": c.same_site,
                "session": is_session_cookie(&c.name),
                "setOnScheme": c.set_on_scheme,
                "setOnHost": c.set_on_host,
            })
        })
        .collect()
}
