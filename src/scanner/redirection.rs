//! Redirection evaluation: does plain HTTP hand the visitor to HTTPS?
//!
//! Works from the HTTP probe (status and Location, no redirects followed)
//! and the final HTTPS URL. The first redirection must stay on the host so
//! a future HSTS header can take effect before the browser leaves.

use reqwest::Url;
use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

/// The redirection evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::RedirectionToHttps;
    let result = classify(requests);

    let data = json!({
        "httpStatus": requests.http_probe.as_ref().map(|p| p.status),
        "httpLocation": requests.http_probe.as_ref().and_then(|p| p.location.clone()),
        "finalUrl": requests.final_url.as_str(),
    });
    TestResult::build("redirection", expectation, result, data, None)
}

fn classify(requests: &Requests) -> Outcome {
    if requests.hsts_preload.preloaded {
        return Outcome::RedirectionAllRedirectsPreloaded;
    }

    let Some(probe) = &requests.http_probe else {
        return Outcome::RedirectionNotNeededNoHttp;
    };

    if (300..400).contains(&probe.status) {
        let Some(location) = probe
            .location
            .as_deref()
            .and_then(|loc| resolve_location(requests, loc))
        else {
            return Outcome::RedirectionNotToHttps;
        };

        if location.scheme() != "https" {
            return Outcome::RedirectionNotToHttpsOnInitialRedirection;
        }
        if location.host_str() != Some(requests.site.host()) {
            return Outcome::RedirectionOffHostFromHttp;
        }
        return Outcome::RedirectionToHttps;
    }

    if probe.status >= 400 {
        // Nothing is served over plain HTTP, so there is nothing to redirect.
        return Outcome::RedirectionNotNeededNoHttp;
    }

    Outcome::RedirectionNotToHttps
}

fn resolve_location(requests: &Requests, location: &str) -> Option<Url> {
    Url::parse(location)
        .or_else(|_| Url::parse(&requests.site.url("http")).and_then(|base| base.join(location)))
        .ok()
}
