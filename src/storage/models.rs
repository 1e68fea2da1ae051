//! Database models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scanner::ScanReport;

/// One persisted scan summary.
///
/// Maps directly to the `scans` table. Full test results are never
/// persisted; only this summary row is.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScanRow {
    /// Numeric row id; 0 until inserted.
    pub id: i64,
    /// Canonical site key.
    pub site_key: String,
    /// ISO-8601 scan start time.
    pub start_time: String,
    /// Grading algorithm version the scan was produced with.
    pub algorithm_version: i64,
    /// Letter grade; null for failed scans.
    pub grade: Option<String>,
    /// Clamped score; null for failed scans.
    pub score: Option<i64>,
    /// Final response status; null for failed scans.
    pub status_code: Option<i64>,
    /// Retrieval error code for failed scans.
    pub error: Option<String>,
    /// Passing test count.
    pub tests_passed: i64,
    /// Failing test count.
    pub tests_failed: i64,
    /// Total test count.
    pub tests_quantity: i64,
}

impl ScanRow {
    /// Builds the summary row for a report; `id` is assigned on insert.
    pub fn from_report(report: &ScanReport) -> ScanRow {
        ScanRow {
            id: 0,
            site_key: report.site_key.clone(),
            start_time: report.start_time.clone(),
            algorithm_version: i64::from(report.algorithm_version),
            grade: report.grade.clone(),
            score: report.score.map(i64::from),
            status_code: report.status_code.map(i64::from),
            error: report.error.clone(),
            tests_passed: i64::from(report.tests_passed),
            tests_failed: i64::from(report.tests_failed),
            tests_quantity: i64::from(report.tests_quantity),
        }
    }

    /// Age of the row relative to `now`, or `None` when the stored start
    /// time does not parse.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let started = DateTime::parse_from_rfc3339(&self.start_time).ok()?;
        Some(now - started.with_timezone(&Utc))
    }

    /// Whether the row is younger than the given window.
    pub fn is_younger_than(&self, window: std::time::Duration) -> bool {
        let Ok(window) = chrono::Duration::from_std(window) else {
            return false;
        };
        self.age(Utc::now()).is_some_and(|age| age < window)
    }
}
