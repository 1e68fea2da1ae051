//! Scan row queries.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{Pool, Sqlite};

use super::models::ScanRow;

/// Inserts a scan summary and returns the row with its assigned id.
pub async fn insert_scan(pool: &Pool<Sqlite>, mut row: ScanRow) -> Result<ScanRow, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO scans (
            site_key, start_time, algorithm_version, grade, score,
            status_code, error, tests_passed, tests_failed, tests_quantity
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.site_key)
    .bind(&row.start_time)
    .bind(row.algorithm_version)
    .bind(&row.grade)
    .bind(row.score)
    .bind(row.status_code)
    .bind(&row.error)
    .bind(row.tests_passed)
    .bind(row.tests_failed)
    .bind(row.tests_quantity)
    .execute(pool)
    .await?;

    row.id = result.last_insert_rowid();
    Ok(row)
}

/// Most recent scan row for a site key, if any.
pub async fn latest_scan(
    pool: &Pool<Sqlite>,
    site_key: &str,
) -> Result<Option<ScanRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM scans WHERE site_key = ? ORDER BY start_time DESC, id DESC LIMIT 1",
    )
    .bind(site_key)
    .fetch_optional(pool)
    .await
}

/// Scan history for a site key, newest first.
pub async fn scan_history(
    pool: &Pool<Sqlite>,
    site_key: &str,
    limit: i64,
) -> Result<Vec<ScanRow>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM scans WHERE site_key = ? ORDER BY start_time DESC, id DESC LIMIT ?",
    )
    .bind(site_key)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Expectation overrides for a site: test name to expectation wire name.
pub async fn load_expectation_overrides(
    pool: &Pool<Sqlite>,
    site_key: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT test_name, expectation FROM expectation_overrides WHERE site_key = ?",
    )
    .bind(site_key)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Aggregate statistics over the persisted corpus.
#[derive(Debug, Clone, Serialize)]
pub struct GradeStats {
    /// Total scan rows, failed scans included.
    pub total_scans: i64,
    /// Distinct site keys seen.
    pub total_sites: i64,
    /// Rows per grade, failed (null-grade) scans excluded.
    pub grade_distribution: Vec<GradeCount>,
}

/// One grade bucket.
#[derive(Debug, Clone, Serialize)]
pub struct GradeCount {
    /// Letter grade.
    pub grade: String,
    /// Number of scans with that grade.
    pub count: i64,
}

/// Computes the grade distribution over all persisted scans.
pub async fn grade_distribution(pool: &Pool<Sqlite>) -> Result<GradeStats, sqlx::Error> {
    let (total_scans,): (i64,) = sqlx::query_as("SELECT count(*) FROM scans")
        .fetch_one(pool)
        .await?;
    let (total_sites,): (i64,) = sqlx::query_as("SELECT count(DISTINCT site_key) FROM scans")
        .fetch_one(pool)
        .await?;
    let buckets: Vec<(String, i64)> = sqlx::query_as(
        "SELECT grade, count(*) FROM scans WHERE grade IS NOT NULL GROUP BY grade ORDER BY grade",
    )
    .fetch_all(pool)
    .await?;

    Ok(GradeStats {
        total_scans,
        total_sites,
        grade_distribution: buckets
            .into_iter()
            .map(|(grade, count)| GradeCount { grade, count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> Pool<Sqlite> {
        // A single connection so every query sees the same in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        super::super::migrations::run_migrations(&pool).await.unwrap();
        pool
    }

    fn row(site_key: &str, start_time: &str, grade: Option<&str>) -> ScanRow {
        ScanRow {
            id: 0,
            site_key: site_key.to_string(),
            start_time: start_time.to_string(),
            algorithm_version: 5,
            grade: grade.map(str::to_string),
            score: grade.map(|_| 90),
            status_code: Some(200),
            error: grade.is_none().then(|| "connection-error".to_string()),
            tests_passed: 9,
            tests_failed: 1,
            tests_quantity: 10,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let pool = test_pool().await;
        let first = insert_scan(&pool, row("a.test", "2026-01-01T00:00:00Z", Some("A")))
            .await
            .unwrap();
        let second = insert_scan(&pool, row("a.test", "2026-01-01T01:00:00Z", Some("B")))
            .await
            .unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_latest_scan_orders_by_start_time() {
        let pool = test_pool().await;
        insert_scan(&pool, row("a.test", "2026-01-01T00:00:00Z", Some("C")))
            .await
            .unwrap();
        insert_scan(&pool, row("a.test", "2026-01-02T00:00:00Z", Some("A")))
            .await
            .unwrap();
        insert_scan(&pool, row("b.test", "2026-01-03T00:00:00Z", Some("F")))
            .await
            .unwrap();

        let latest = latest_scan(&pool, "a.test").await.unwrap().unwrap();
        assert_eq!(latest.grade.as_deref(), Some("A"));
        assert!(latest_scan(&pool, "missing.test").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let pool = test_pool().await;
        for hour in 0..5 {
            insert_scan(
                &pool,
                row("a.test", &format!("2026-01-01T0{hour}:00:00Z"), Some("B")),
            )
            .await
            .unwrap();
        }
        let history = scan_history(&pool, "a.test", 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].start_time, "2026-01-01T04:00:00Z");
    }

    #[tokio::test]
    async fn test_grade_distribution_skips_failed_scans() {
        let pool = test_pool().await;
        insert_scan(&pool, row("a.test", "2026-01-01T00:00:00Z", Some("A")))
            .await
            .unwrap();
        insert_scan(&pool, row("b.test", "2026-01-01T00:00:00Z", Some("A")))
            .await
            .unwrap();
        insert_scan(&pool, row("c.test", "2026-01-01T00:00:00Z", None))
            .await
            .unwrap();

        let stats = grade_distribution(&pool).await.unwrap();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.total_sites, 3);
        assert_eq!(stats.grade_distribution.len(), 1);
        assert_eq!(stats.grade_distribution[0].grade, "A");
        assert_eq!(stats.grade_distribution[0].count, 2);
    }

    #[tokio::test]
    async fn test_expectation_overrides_round_trip() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO expectation_overrides (site_key, test_name, expectation) VALUES (?, ?, ?)",
        )
        .bind("a.test")
        .bind("x-frame-options")
        .bind("x-frame-options-not-implemented")
        .execute(&pool)
        .await
        .unwrap();

        let overrides = load_expectation_overrides(&pool, "a.test").await.unwrap();
        assert_eq!(
            overrides.get("x-frame-options").map(String::as_str),
            Some("x-frame-options-not-implemented")
        );
        assert!(load_expectation_overrides(&pool, "b.test")
            .await
            .unwrap()
            .is_empty());
    }
}
