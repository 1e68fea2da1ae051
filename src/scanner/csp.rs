//! Content-Security-Policy parsing and classification.
//!
//! Header-delivered and meta-delivered policies are merged into one
//! effective policy with per-directive provenance, then classified against
//! a prioritized rule set, most severe first. The parsed policy is recorded
//! in the test's `data` so callers can audit the decision.

use std::collections::BTreeMap;

use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::json;

use crate::retriever::Requests;
use crate::scanner::{Outcome, TestResult};

/// Directives a `<meta http-equiv>` policy is not allowed to set.
const META_DISALLOWED: &[&str] = &["frame-ancestors", "report-uri", "sandbox"];

/// Directives carrying passive content (images, media); an insecure scheme
/// here is graded more leniently than in active-content directives.
const PASSIVE_DIRECTIVES: &[&str] = &["img-src", "media-src"];

/// Where a directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySource {
    /// Delivered in a `Content-Security-Policy` response header.
    Header,
    /// Delivered in a `<meta http-equiv>` element of the HTML body.
    Meta,
}

/// Effective policy: directive name to ordered source expressions, plus the
/// origin of each directive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CspPolicy {
    /// Lower-cased directive names mapped to their source expressions.
    pub directives: BTreeMap<String, Vec<String>>,
    /// Which delivery mechanism contributed each directive.
    pub provenance: BTreeMap<String, PolicySource>,
}

impl CspPolicy {
    /// Whether no directive was collected at all.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Merges one serialized policy. The first policy to define a directive
    /// owns it (later same-named directives are ignored, matching browser
    /// behavior), and meta policies may not contribute the directives
    /// browsers reject from meta delivery.
    ///
    /// Returns `false` when the text contains no parseable directive.
    fn merge_serialized(&mut self, text: &str, source: PolicySource) -> bool {
        let mut any = false;
        for clause in text.split(';') {
            let mut tokens = clause.split_ascii_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            let name = name.to_ascii_lowercase();
            if !is_directive_name(&name) {
                continue;
            }
            any = true;
            if source == PolicySource::Meta && META_DISALLOWED.contains(&name.as_str()) {
                continue;
            }
            if self.directives.contains_key(&name) {
                continue;
            }
            let sources: Vec<String> = tokens.map(str::to_string).collect();
            self.directives.insert(name.clone(), sources);
            self.provenance.insert(name, source);
        }
        any
    }

    /// Source list for a fetch directive, resolving the `default-src`
    /// fallback. `None` means neither the directive nor `default-src` is
    /// present.
    pub fn effective(&self, directive: &str) -> Option<&[String]> {
        self.directives
            .get(directive)
            .or_else(|| self.directives.get("default-src"))
            .map(Vec::as_slice)
    }
}

/// Everything the classifier needs, assembled from one `Requests` bundle.
#[derive(Debug, Clone, Default)]
pub struct CspAnalysis {
    /// The merged effective policy.
    pub policy: CspPolicy,
    /// Whether a CSP header was present.
    pub header_present: bool,
    /// Whether a meta-delivered policy was present.
    pub meta_present: bool,
    /// Whether any delivered policy failed to parse.
    pub invalid: bool,
}

/// Collects header and meta policies from the bundle.
pub fn analyze(requests: &Requests) -> CspAnalysis {
    let mut analysis = CspAnalysis::default();

    for value in requests.headers.all("content-security-policy") {
        analysis.header_present = true;
        if !analysis.policy.merge_serialized(value, PolicySource::Header) {
            analysis.invalid = true;
        }
    }

    if requests.is_html() {
        for value in extract_meta_policies(&requests.body) {
            analysis.meta_present = true;
            if !analysis.policy.merge_serialized(&value, PolicySource::Meta) {
                analysis.invalid = true;
            }
        }
    }

    analysis
}

/// Source lists of every `frame-ancestors` directive delivered by header.
///
/// Used by the x-frame-options test to honor CSP-based framing control; meta
/// policies cannot set it.
pub fn header_frame_ancestors(requests: &Requests) -> Option<Vec<String>> {
    for value in requests.headers.all("content-security-policy") {
        let mut policy = CspPolicy::default();
        policy.merge_serialized(value, PolicySource::Header);
        if let Some(sources) = policy.directives.get("frame-ancestors") {
            return Some(sources.clone());
        }
    }
    None
}

/// Classifies the analysis against the outcome vocabulary, most severe
/// matching rule first.
pub fn classify(analysis: &CspAnalysis) -> Outcome {
    if analysis.invalid {
        return Outcome::CspHeaderInvalid;
    }
    if !analysis.header_present && !analysis.meta_present {
        return Outcome::CspNotImplemented;
    }
    if analysis.policy.is_empty() {
        return Outcome::CspHeaderInvalid;
    }

    let policy = &analysis.policy;
    if !policy.directives.contains_key("default-src") && !policy.directives.contains_key("script-src")
    {
        return Outcome::CspImplementedButNoDefaultSrcOrScriptSrc;
    }

    let script = policy.effective("script-src").unwrap_or(&[]);

    if has_active_unsafe_inline(script) {
        return Outcome::CspImplementedWithUnsafeInline;
    }
    if script.iter().any(|s| is_insecure_source(s, true)) {
        return Outcome::CspImplementedWithInsecureScheme;
    }
    if script.iter().any(|s| keyword_eq(s, "'unsafe-eval'")) {
        return Outcome::CspImplementedWithUnsafeEval;
    }

    let passive_insecure = PASSIVE_DIRECTIVES.iter().any(|d| {
        policy
            .effective(d)
            .unwrap_or(&[])
            .iter()
            .any(|s| is_insecure_source(s, false))
    });
    if passive_insecure {
        return Outcome::CspImplementedWithInsecureSchemeInPassiveContentOnly;
    }

    let style = policy.effective("style-src").unwrap_or(&[]);
    if has_active_unsafe_inline(style) {
        return Outcome::CspImplementedWithUnsafeInlineInStyleSrcOnly;
    }

    Outcome::CspImplementedWithNoUnsafe
}

/// The content-security-policy evaluator.
pub fn evaluate(requests: &Requests) -> TestResult {
    let analysis = analyze(requests);
    let result = classify(&analysis);

    let data = json!({
        "policy": analysis.policy.directives,
        "provenance": analysis.policy.provenance,
        "headerDelivered": analysis.header_present,
        "metaDelivered": analysis.meta_present,
    });

    TestResult::build(
        "content-security-policy",
        Outcome::CspImplementedWithNoUnsafe,
        result,
        data,
        None,
    )
}

/// `'unsafe-inline'` counts as active only when no nonce, hash, or
/// `'strict-dynamic'` source neutralizes it.
fn has_active_unsafe_inline(sources: &[String]) -> bool {
    let unsafe_inline = sources.iter().any(|s| keyword_eq(s, "'unsafe-inline'"));
    if !unsafe_inline {
        return false;
    }
    !sources.iter().any(|s| {
        let s = s.to_ascii_lowercase();
        s.starts_with("'nonce-")
            || s.starts_with("'sha256-")
            || s.starts_with("'sha384-")
            || s.starts_with("'sha512-")
            || s == "'strict-dynamic'"
    })
}

fn keyword_eq(source: &str, keyword: &str) -> bool {
    source.eq_ignore_ascii_case(keyword)
}

/// Whether a source expression admits content over an insecure scheme.
/// `data:` is insecure for active content (scripts) but tolerated in
/// passive-content directives.
fn is_insecure_source(source: &str, include_data: bool) -> bool {
    let s = source.to_ascii_lowercase();
    s == "http:"
        || s.starts_with("http://")
        || s == "ftp:"
        || s.starts_with("ftp://")
        || (include_data && s == "data:")
}

/// A directive name is ASCII letters and hyphens only.
fn is_directive_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn extract_meta_policies(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let selector = match Selector::parse("meta[http-equiv]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter(|el| {
            el.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-security-policy"))
        })
        .filter_map(|el| el.value().attr("content"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::requests_with_headers;

    fn classify_headers(csp: &str) -> Outcome {
        let requests = requests_with_headers(&[("content-security-policy", csp)]);
        classify(&analyze(&requests))
    }

    #[test]
    fn test_strict_policy_is_no_unsafe() {
        assert_eq!(
            classify_headers("default-src 'none'; script-src 'self'; style-src 'self'"),
            Outcome::CspImplementedWithNoUnsafe
        );
    }

    #[test]
    fn test_unsafe_inline_in_script_src() {
        assert_eq!(
            classify_headers("default-src 'self'; script-src 'self' 'unsafe-inline'"),
            Outcome::CspImplementedWithUnsafeInline
        );
    }

    #[test]
    fn test_unsafe_inline_neutralized_by_nonce() {
        assert_eq!(
            classify_headers("script-src 'self' 'unsafe-inline' 'nonce-abc123'"),
            Outcome::CspImplementedWithNoUnsafe
        );
        assert_eq!(
            classify_headers("script-src 'unsafe-inline' 'strict-dynamic' 'sha256-xyz'"),
            Outcome::CspImplementedWithNoUnsafe
        );
    }

    #[test]
    fn test_unsafe_eval() {
        assert_eq!(
            classify_headers("default-src 'self'; script-src 'self' 'unsafe-eval'"),
            Outcome::CspImplementedWithUnsafeEval
        );
    }

    #[test]
    fn test_unsafe_inline_outranks_unsafe_eval() {
        assert_eq!(
            classify_headers("script-src 'unsafe-inline' 'unsafe-eval'"),
            Outcome::CspImplementedWithUnsafeInline
        );
    }

    #[test]
    fn test_insecure_scheme_in_script_src() {
        assert_eq!(
            classify_headers("default-src 'self'; script-src http://cdn.example.com"),
            Outcome::CspImplementedWithInsecureScheme
        );
        assert_eq!(
            classify_headers("default-src http:"),
            Outcome::CspImplementedWithInsecureScheme
        );
    }

    #[test]
    fn test_data_uri_is_insecure_for_scripts_only() {
        assert_eq!(
            classify_headers("default-src 'self'; script-src data:"),
            Outcome::CspImplementedWithInsecureScheme
        );
        assert_eq!(
            classify_headers("default-src 'self'; img-src data:"),
            Outcome::CspImplementedWithNoUnsafe
        );
    }

    #[test]
    fn test_insecure_scheme_in_passive_content_only() {
        assert_eq!(
            classify_headers("default-src 'self'; img-src http://images.example.com"),
            Outcome::CspImplementedWithInsecureSchemeInPassiveContentOnly
        );
    }

    #[test]
    fn test_unsafe_inline_in_style_src_only() {
        assert_eq!(
            classify_headers("default-src 'self'; style-src 'self' 'unsafe-inline'"),
            Outcome::CspImplementedWithUnsafeInlineInStyleSrcOnly
        );
    }

    #[test]
    fn test_missing_default_and_script_src() {
        assert_eq!(
            classify_headers("img-src 'self'; style-src 'self'"),
            Outcome::CspImplementedButNoDefaultSrcOrScriptSrc
        );
    }

    #[test]
    fn test_not_implemented_and_invalid() {
        let requests = requests_with_headers(&[]);
        assert_eq!(classify(&analyze(&requests)), Outcome::CspNotImplemented);

        assert_eq!(classify_headers("   ;;; "), Outcome::CspHeaderInvalid);
        assert_eq!(classify_headers("@@@ ###"), Outcome::CspHeaderInvalid);
    }

    #[test]
    fn test_default_src_none_with_no_script_src_is_safe() {
        assert_eq!(
            classify_headers("default-src 'none'"),
            Outcome::CspImplementedWithNoUnsafe
        );
    }

    #[test]
    fn test_meta_policy_is_merged_with_header_precedence() {
        let mut requests = requests_with_headers(&[(
            "content-security-policy",
            "default-src 'self'; script-src 'self'",
        )]);
        requests.body = concat!(
            "<html><head><meta http-equiv=\"Content-Security-Policy\" ",
            "content=\"script-src 'unsafe-inline'; style-src 'self'\"></head></html>"
        )
        .to_string();

        let analysis = analyze(&requests);
        // script-src came from the header first; meta only added style-src.
        assert_eq!(
            analysis.policy.provenance.get("script-src"),
            Some(&PolicySource::Header)
        );
        assert_eq!(
            analysis.policy.provenance.get("style-src"),
            Some(&PolicySource::Meta)
        );
        assert_eq!(classify(&analysis), Outcome::CspImplementedWithNoUnsafe);
    }

    #[test]
    fn test_meta_only_policy() {
        let mut requests = requests_with_headers(&[]);
        requests.body = concat!(
            "<html><head><meta http-equiv=\"content-security-policy\" ",
            "content=\"default-src 'self'\"></head></html>"
        )
        .to_string();

        let analysis = analyze(&requests);
        assert!(analysis.meta_present);
        assert!(!analysis.header_present);
        assert_eq!(classify(&analysis), Outcome::CspImplementedWithNoUnsafe);
    }

    #[test]
    fn test_meta_cannot_set_frame_ancestors() {
        let mut requests = requests_with_headers(&[]);
        requests.body = concat!(
            "<html><head><meta http-equiv=\"Content-Security-Policy\" ",
            "content=\"default-src 'self'; frame-ancestors 'none'\"></head></html>"
        )
        .to_string();

        let analysis = analyze(&requests);
        assert!(!analysis.policy.directives.contains_key("frame-ancestors"));
        assert!(header_frame_ancestors(&requests).is_none());
    }

    #[test]
    fn test_header_frame_ancestors() {
        let requests = requests_with_headers(&[(
            "content-security-policy",
            "default-src 'self'; frame-ancestors 'none'",
        )]);
        assert_eq!(
            header_frame_ancestors(&requests),
            Some(vec!["'none'".to_string()])
        );
    }

    #[test]
    fn test_evaluate_records_policy_in_data() {
        let requests = requests_with_headers(&[(
            "content-security-policy",
            "default-src 'none'; script-src 'self'",
        )]);
        let result = evaluate(&requests);
        assert!(result.pass);
        assert_eq!(result.score_modifier, 5);
        assert_eq!(result.data["policy"]["script-src"][0], "'self'");
        assert_eq!(result.data["headerDelivered"], true);
    }
}
