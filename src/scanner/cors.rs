//! Cross-origin resource sharing evaluation.
//!
//! Inspects `Access-Control-Allow-Origin` and, when the retriever fetched
//! them, the Flash and Silverlight policy files. A wildcard policy file is
//! far worse than a wildcard ACAO header: the header exposes responses
//! without credentials, while `crossdomain.xml`/`clientaccesspolicy.xml`
//! grant credentialed access to every origin.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

static CROSSDOMAIN_WILDCARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<allow-access-from[^>]*domain\s*=\s*["']\*["']"#).expect("static regex"));

static CLIENTACCESS_WILDCARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<domain[^>]*uri\s*=\s*["']\*["']"#).expect("static regex"));

/// The cross-origin-resource-sharing evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let expectation = Outcome::CorsNotImplemented;
    let acao = requests.headers.first("access-control-allow-origin");

    let crossdomain = requests.crossdomain_xml.as_deref();
    let clientaccess = requests.clientaccesspolicy_xml.as_deref();

    let mut result = match acao {
        None => Outcome::CorsNotImplemented,
        Some(value) if value.trim() == "*" => Outcome::CorsImplementedWithPublicAccess,
        Some(_) => Outcome::CorsImplementedWithRestrictedAccess,
    };

    for (body, marker, wildcard) in [
        (crossdomain, "<cross-domain-policy", &CROSSDOMAIN_WILDCARD),
        (clientaccess, "<access-policy", &CLIENTACCESS_WILDCARD),
    ] {
        let Some(body) = body else { continue };
        if !body.to_ascii_lowercase().contains(marker) {
            if result.score_modifier() > Outcome::XmlNotParsable.score_modifier() {
                result = Outcome::XmlNotParsable;
            }
            continue;
        }
        if wildcard.is_match(body) {
            result = Outcome::CorsImplementedWithUniversalAccess;
        } else if result == Outcome::CorsNotImplemented {
            result = Outcome::CorsImplementedWithRestrictedAccess;
        }
    }

    let data = json!({
        "accessControlAllowOrigin": acao,
        "crossdomainXmlPresent": crossdomain.is_some(),
        "clientAccessPolicyPresent": clientaccess.is_some(),
    });

    TestResult::build("cross-origin-resource-sharing", expectation, result, data, None)
}
