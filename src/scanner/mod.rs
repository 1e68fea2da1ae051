//! The test battery: independent evaluators over a [`Requests`] snapshot.
//!
//! Each test is a pure function from the snapshot to a [`TestResult`]; the
//! registry lists them as plain records iterated in a fixed order, so the
//! battery is deterministic and the tests may equally be evaluated in
//! parallel. No evaluator performs I/O.

pub mod cookies;
pub mod cors;
pub mod csp;
pub mod grade;
pub mod headers;
pub mod hsts;
pub mod outcome;
pub mod redirection;
pub mod referrer;
pub mod sri;

use std::collections::HashMap;

use serde::Serialize;

use crate::retriever::Requests;

pub use grade::{build_report, error_report, grade_for_score, ScanReport, ALGORITHM_VERSION};
pub use outcome::Outcome;

/// Outcome of one test for one scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Test name, as it appears in the report's tests map.
    pub name: &'static str,
    /// The outcome expected to pass for this site.
    pub expectation: Outcome,
    /// The outcome the evaluator actually produced.
    pub result: Outcome,
    /// Whether the result satisfies the expectation.
    pub pass: bool,
    /// Score delta contributed by the result.
    pub score_modifier: i32,
    /// Test-specific evidence backing the decision.
    pub data: serde_json::Value,
    /// Internal grading note; stripped from all serialized output.
    #[serde(skip_serializing)]
    pub score_description: Option<String>,
}

impl TestResult {
    /// Builds a result with the default pass rule: the outcome's own pass
    /// verdict from the frozen table.
    pub fn build(
        name: &'static str,
        expectation: Outcome,
        result: Outcome,
        data: serde_json::Value,
        score_description: Option<String>,
    ) -> TestResult {
        TestResult {
            name,
            expectation,
            result,
            pass: result.passes(),
            score_modifier: result.score_modifier(),
            data,
            score_description,
        }
    }

    /// Re-evaluates the pass flag against a site-specific expectation
    /// override. The score modifier is unchanged: overrides adjust what
    /// counts as expected for a site, not how the outcome scores.
    pub fn with_expectation(mut self, expectation: Outcome) -> TestResult {
        self.pass = self.result == expectation;
        self.expectation = expectation;
        self
    }
}

/// One registry entry: a name, the default expectation, and the evaluator.
pub struct TestSpec {
    /// Test name.
    pub name: &'static str,
    /// Default expectation for sites without an override.
    pub expectation: Outcome,
    /// The evaluator.
    pub evaluate: fn(&Requests) -> TestResult,
}

/// The battery, in evaluation order.
pub const TEST_BATTERY: &[TestSpec] = &[
    TestSpec {
        name: "content-security-policy",
        expectation: Outcome::CspImplementedWithNoUnsafe,
        evaluate: csp::evaluate,
    },
    TestSpec {
        name: "cookies",
        expectation: Outcome::CookiesSecureWithHttponlySessions,
        evaluate: cookies::evaluate,
    },
    TestSpec {
        name: "cross-origin-resource-policy",
        expectation: Outcome::CorpNotImplemented,
        evaluate: headers::evaluate_corp,
    },
    TestSpec {
        name: "cross-origin-resource-sharing",
        expectation: Outcome::CorsNotImplemented,
        evaluate: cors::evaluate,
    },
    TestSpec {
        name: "redirection",
        expectation: Outcome::RedirectionToHttps,
        evaluate: redirection::evaluate,
    },
    TestSpec {
        name: "referrer-policy",
        expectation: Outcome::ReferrerPolicyPrivate,
        evaluate: referrer::evaluate,
    },
    TestSpec {
        name: "strict-transport-security",
        expectation: Outcome::HstsImplementedMaxAgeAtLeastSixMonths,
        evaluate: hsts::evaluate,
    },
    TestSpec {
        name: "subresource-integrity",
        expectation: Outcome::SriImplementedAndExternalScriptsLoadedSecurely,
        evaluate: sri::evaluate,
    },
    TestSpec {
        name: "x-content-type-options",
        expectation: Outcome::XContentTypeOptionsNosniff,
        evaluate: headers::evaluate_xcto,
    },
    TestSpec {
        name: "x-frame-options",
        expectation: Outcome::XFrameOptionsSameoriginOrDeny,
        evaluate: headers::evaluate_xfo,
    },
];

/// Runs every test against the snapshot, applying any per-site expectation
/// overrides.
pub fn run_battery(
    requests: &Requests,
    overrides: &HashMap<String, Outcome>,
) -> Vec<TestResult> {
    TEST_BATTERY
        .iter()
        .map(|spec| {
            let result = (spec.evaluate)(requests);
            match overrides.get(spec.name) {
                Some(expectation) => result.with_expectation(*expectation),
                None => result,
            }
        })
        .collect()
}
