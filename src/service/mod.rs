//! Scan orchestration: canonicalize, consult the cooldown cache, run the
//! retriever and battery under single-flight, persist the summary row.
//!
//! This layer owns the concurrency discipline: at most one active scan per
//! site key, cooldown short-circuiting against the persisted corpus, and
//! bounded-concurrency batch draining with dedup.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};
use sqlx::{Pool, Sqlite};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::cache::SingleFlight;
use crate::config::{Config, DEFAULT_CONCURRENCY};
use crate::error_handling::{RetrievalError, ScanError, ValidationError};
use crate::retriever::Retrieve;
use crate::scanner::{self, Outcome, ScanReport};
use crate::site::Site;
use crate::storage::{self, ScanRow};

/// The complete outcome of one scan attempt.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Retrieval and grading completed.
    Completed {
        /// The full report, tests included.
        report: ScanReport,
        /// The summary row (persisted when the run was persisting).
        row: ScanRow,
    },
    /// Retrieval failed; the report carries the error with a null grade.
    Failed {
        /// Error report with an empty tests map.
        report: ScanReport,
        /// The persisted failure row, absent for cancelled scans.
        row: Option<ScanRow>,
        /// What went wrong.
        error: RetrievalError,
    },
    /// The host was rejected before any probe ran. Never persisted.
    Rejected {
        /// The validation failure.
        error: ValidationError,
    },
}

/// A batch entry: either a completed scan or a per-entry failure that never
/// aborts the batch.
#[derive(Debug)]
pub enum BatchEntry {
    /// The scan ran; summary row plus fresh full details.
    Ok {
        /// Summary row.
        row: ScanRow,
        /// Full report for the entry.
        report: ScanReport,
    },
    /// The entry failed validation or retrieval.
    Err {
        /// Stable error code.
        error: String,
        /// Human-readable message.
        message: String,
    },
}

/// Scan orchestrator shared by the API server and the CLI.
pub struct ScanService {
    retriever: Arc<dyn Retrieve>,
    pool: Arc<Pool<Sqlite>>,
    flights: SingleFlight<ScanOutcome>,
    config: Config,
    shutdown: CancellationToken,
}

impl ScanService {
    /// Builds the service around a retriever and an open database pool.
    pub fn new(retriever: Arc<dyn Retrieve>, pool: Arc<Pool<Sqlite>>, config: Config) -> ScanService {
        ScanService {
            retriever,
            pool,
            flights: SingleFlight::new(),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancels every in-flight scan.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Canonicalizes a host string.
    pub fn canonicalize(&self, host: &str) -> Result<Site, ValidationError> {
        Site::from_input(host)
    }

    /// Summary semantics: cached row inside the cooldown window, otherwise a
    /// fresh persisted scan.
    pub async fn scan_summary(&self, host: &str) -> Result<ScanRow, ScanError> {
        let site = self.canonicalize(host)?;
        if let Some(row) = self.fresh_row(&site, self.config.cooldown).await {
            return Ok(row);
        }
        let outcome = self.run_scan(site, true).await;
        match &*outcome {
            ScanOutcome::Completed { row, .. } => Ok(row.clone()),
            ScanOutcome::Failed { row: Some(row), .. } => Ok(row.clone()),
            ScanOutcome::Failed { error, .. } => Err(error.clone().into()),
            ScanOutcome::Rejected { error } => Err(error.clone().into()),
        }
    }

    /// Full-details semantics: the summary row follows the cooldown policy,
    /// but the report is always produced by a fresh in-memory scan, since
    /// persistence holds only the summary.
    pub async fn scan_full_details(&self, host: &str) -> Result<(ScanRow, ScanReport), ScanError> {
        let site = self.canonicalize(host)?;
        let cached = self.fresh_row(&site, self.config.cooldown).await;

        // Inside the cooldown window the fresh scan is in-memory only; no
        // second row is written.
        let outcome = self.run_scan(site, cached.is_none()).await;
        match &*outcome {
            ScanOutcome::Completed { report, row } => {
                Ok((cached.unwrap_or_else(|| row.clone()), report.clone()))
            }
            ScanOutcome::Failed {
                report,
                row,
                error,
            } => match cached.or_else(|| row.clone()) {
                Some(row) => Ok((row, report.clone())),
                None => Err(error.clone().into()),
            },
            ScanOutcome::Rejected { error } => Err(error.clone().into()),
        }
    }

    /// GET-analyze semantics: a longer cache window and no forced re-scan.
    pub async fn analyze_cached(&self, host: &str) -> Result<ScanRow, ScanError> {
        let site = self.canonicalize(host)?;
        if let Some(row) = self.fresh_row(&site, self.config.get_cache_age).await {
            return Ok(row);
        }
        let outcome = self.run_scan(site, true).await;
        match &*outcome {
            ScanOutcome::Completed { row, .. } => Ok(row.clone()),
            ScanOutcome::Failed { row: Some(row), .. } => Ok(row.clone()),
            ScanOutcome::Failed { error, .. } => Err(error.clone().into()),
            ScanOutcome::Rejected { error } => Err(error.clone().into()),
        }
    }

    /// Scan history for a host, newest first.
    pub async fn history(&self, host: &str, limit: i64) -> Result<Vec<ScanRow>, ScanError> {
        let site = self.canonicalize(host)?;
        storage::scan_history(&self.pool, &site.site_key(), limit)
            .await
            .map_err(|e| RetrievalError::ScanFailed(e.to_string()).into())
    }

    /// Aggregate statistics over the persisted corpus.
    pub async fn stats(&self) -> Result<storage::GradeStats, ScanError> {
        storage::grade_distribution(&self.pool)
            .await
            .map_err(|e| RetrievalError::ScanFailed(e.to_string()).into())
    }

    /// Batch semantics: dedup by canonical key, bounded concurrency, one
    /// full-details scan per distinct site, per-entry failures reported
    /// under the entry's key.
    pub async fn scan_batch(&self, urls: &[String]) -> BTreeMap<String, BatchEntry> {
        let mut entries = BTreeMap::new();
        let mut distinct: Vec<Site> = Vec::new();

        for url in urls {
            match self.canonicalize(url) {
                Ok(site) => {
                    if !distinct.iter().any(|s| s.site_key() == site.site_key()) {
                        distinct.push(site);
                    }
                }
                Err(e) => {
                    entries.insert(
                        url.trim().to_string(),
                        BatchEntry::Err {
                            error: e.code().to_string(),
                            message: e.to_string(),
                        },
                    );
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(DEFAULT_CONCURRENCY));
        let mut tasks = FuturesUnordered::new();
        for site in distinct {
            let semaphore = Arc::clone(&semaphore);
            let key = site.site_key();
            tasks.push(async move {
                let _permit = semaphore.acquire().await;
                let entry = match self.scan_full_details(&key).await {
                    Ok((row, report)) => BatchEntry::Ok { row, report },
                    Err(e) => BatchEntry::Err {
                        error: e.code().to_string(),
                        message: e.to_string(),
                    },
                };
                (key, entry)
            });
        }

        while let Some((key, entry)) = tasks.next().await {
            entries.insert(key, entry);
        }
        entries
    }

    /// One-shot scan, bypassing cache and persistence. Used by the CLI.
    pub async fn scan_once(&self, host: &str) -> Result<Arc<ScanOutcome>, ValidationError> {
        let site = self.canonicalize(host)?;
        Ok(self.run_scan(site, false).await)
    }

    async fn fresh_row(&self, site: &Site, window: std::time::Duration) -> Option<ScanRow> {
        match storage::latest_scan(&self.pool, &site.site_key()).await {
            Ok(Some(row)) if row.is_younger_than(window) => Some(row),
            Ok(_) => None,
            Err(e) => {
                warn!("Cache lookup failed for {}: {e}", site.site_key());
                None
            }
        }
    }

    /// Runs the retriever and battery under single-flight for the site key.
    /// The winning flight persists the row (when `persist` is set) before
    /// concurrent callers observe the outcome.
    async fn run_scan(&self, site: Site, persist: bool) -> Arc<ScanOutcome> {
        let key = site.site_key();
        let retriever = Arc::clone(&self.retriever);
        let pool = Arc::clone(&self.pool);
        let cancel = self.shutdown.child_token();

        self.flights
            .run(&key, move || async move {
                let started = Utc::now();
                let site_key = site.site_key();
                info!("Scanning {site_key}");

                let requests = match retriever.retrieve(&site, cancel).await {
                    Ok(requests) => requests,
                    Err(ScanError::Validation(error)) => {
                        return ScanOutcome::Rejected { error };
                    }
                    Err(ScanError::Retrieval(error)) => {
                        warn!("Scan failed for {site_key}: {error}");
                        let report = scanner::error_report(&site_key, &error, started);
                        let mut row = None;
                        if persist && error.is_persistable() {
                            row = persist_row(&pool, ScanRow::from_report(&report)).await;
                        }
                        return ScanOutcome::Failed { report, row, error };
                    }
                };

                let overrides = load_overrides(&pool, &site_key).await;
                let results = scanner::run_battery(&requests, &overrides);
                let report = scanner::build_report(&requests, results, started);
                info!(
                    "Scan of {site_key} complete: grade {} score {}",
                    report.grade.as_deref().unwrap_or("-"),
                    report.score.unwrap_or_default(),
                );

                let mut row = ScanRow::from_report(&report);
                if persist {
                    if let Some(inserted) = persist_row(&pool, row.clone()).await {
                        row = inserted;
                    }
                }
                ScanOutcome::Completed { report, row }
            })
            .await
    }
}

async fn persist_row(pool: &Pool<Sqlite>, row: ScanRow) -> Option<ScanRow> {
    match storage::insert_scan(pool, row).await {
        Ok(row) => Some(row),
        Err(e) => {
            warn!("Failed to persist scan row: {e}");
            None
        }
    }
}

async fn load_overrides(pool: &Pool<Sqlite>, site_key: &str) -> HashMap<String, Outcome> {
    match storage::load_expectation_overrides(pool, site_key).await {
        Ok(raw) => raw
            .into_iter()
            .filter_map(|(test, expectation)| {
                match Outcome::from_str(&expectation) {
                    Ok(outcome) => Some((test, outcome)),
                    Err(_) => {
                        warn!("Ignoring unknown expectation override {expectation} for {site_key}");
                        None
                    }
                }
            })
            .collect(),
        Err(e) => {
            warn!("Failed to load expectation overrides for {site_key}: {e}");
            HashMap::new()
        }
    }
}
