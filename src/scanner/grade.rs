//! The grader: reduces test results to a score, a letter grade, and a
//! [`ScanReport`].
//!
//! Scoring is a closed-form, order-insensitive reduction: start at 100, add
//! every test's modifier, clamp into [0, 135], look the grade up by
//! threshold. The grader never fails; a scan with a retrieval error
//! produces a report with null grade/score and an empty tests map.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::error_handling::RetrievalError;
use crate::retriever::{Headers, Requests};
use crate::scanner::TestResult;

/// Grading algorithm version; bumped whenever scoring semantics change.
/// Callers use it to invalidate caches.
pub const ALGORITHM_VERSION: i32 = 5;

/// Baseline score before modifiers.
const BASE_SCORE: i32 = 100;

/// Score bounds after summing modifiers.
const SCORE_FLOOR: i32 = 0;
const SCORE_CEILING: i32 = 135;

/// Threshold table mapping a clamped score to its letter grade.
const GRADE_THRESHOLDS: &[(i32, &str)] = &[
    (100, "A+"),
    (90, "A"),
    (85, "A-"),
    (80, "B+"),
    (70, "B"),
    (65, "B-"),
    (60, "C+"),
    (50, "C"),
    (45, "C-"),
    (40, "D+"),
    (30, "D"),
    (25, "D-"),
];

/// Letter grade for a clamped score.
pub fn grade_for_score(score: i32) -> &'static str {
    for (threshold, grade) in GRADE_THRESHOLDS {
        if score >= *threshold {
            return grade;
        }
    }
    "F"
}

/// One scan's complete outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Grading algorithm version stamped on the report.
    pub algorithm_version: i32,
    /// Canonical site key the scan was produced for.
    pub site_key: String,
    /// ISO-8601 start time supplied by the caller, so a fixed `Requests`
    /// bundle grades to a byte-identical report.
    pub start_time: String,
    /// Letter grade, or `None` for failed scans.
    pub grade: Option<String>,
    /// Clamped score, or `None` for failed scans.
    pub score: Option<i32>,
    /// Status code of the final response, when one was obtained.
    pub status_code: Option<u16>,
    /// Retrieval error code for failed scans.
    pub error: Option<String>,
    /// Number of passing tests.
    pub tests_passed: u32,
    /// Number of failing tests.
    pub tests_failed: u32,
    /// Total tests evaluated; always `tests_passed + tests_failed`.
    pub tests_quantity: u32,
    /// Response headers of the final response.
    pub response_headers: Headers,
    /// Per-test results keyed by test name.
    pub tests: BTreeMap<String, TestResult>,
}

impl ScanReport {
    /// The CLI output shape: the summary under a top-level `scan` wrapper
    /// with the tests map alongside.
    pub fn to_cli_json(&self) -> serde_json::Value {
        let mut scan = serde_json::to_value(self).unwrap_or_default();
        let tests = scan
            .as_object_mut()
            .and_then(|o| o.remove("tests"))
            .unwrap_or_default();
        serde_json::json!({ "scan": scan, "tests": tests })
    }
}

/// Builds the report for a completed retrieval.
pub fn build_report(
    requests: &Requests,
    results: Vec<TestResult>,
    start_time: DateTime<Utc>,
) -> ScanReport {
    let mut passed = 0u32;
    let mut failed = 0u32;
    let mut score = BASE_SCORE;
    for result in &results {
        if result.pass {
            passed += 1;
        } else {
            failed += 1;
        }
        score += result.score_modifier;
    }
    let score = score.clamp(SCORE_FLOOR, SCORE_CEILING);

    let tests: BTreeMap<String, TestResult> = results
        .into_iter()
        .map(|r| (r.name.to_string(), r))
        .collect();

    ScanReport {
        algorithm_version: ALGORITHM_VERSION,
        site_key: requests.site.site_key(),
        start_time: start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        grade: Some(grade_for_score(score).to_string()),
        score: Some(score),
        status_code: Some(requests.status_code),
        error: None,
        tests_passed: passed,
        tests_failed: failed,
        tests_quantity: passed + failed,
        response_headers: requests.headers.clone(),
        tests,
    }
}

/// Builds the report for a scan whose retrieval failed.
pub fn error_report(
    site_key: &str,
    error: &RetrievalError,
    start_time: DateTime<Utc>,
) -> ScanReport {
    ScanReport {
        algorithm_version: ALGORITHM_VERSION,
        site_key: site_key.to_string(),
        start_time: start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        grade: None,
        score: None,
        status_code: None,
        error: Some(error.code().to_string()),
        tests_passed: 0,
        tests_failed: 0,
        tests_quantity: 0,
        response_headers: Headers::default(),
        tests: BTreeMap::new(),
    }
}
