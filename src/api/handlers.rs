//! Endpoint handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::config::MAX_BATCH_SIZE;
use crate::service::{BatchEntry, ScanService};

use super::types::{
    AnalyzeResponse, ApiError, BatchRequest, FullDetailsResponse, HostQuery, ScanResponse,
};

/// How many history rows analyze responses carry.
const HISTORY_LIMIT: i64 = 10;

fn details_url(service: &ScanService, site_key: &str) -> Option<String> {
    service.config().base_url.as_ref().map(|base| {
        format!(
            "{}/api/v2/analyze?host={site_key}",
            base.trim_end_matches('/')
        )
    })
}

/// `POST /api/v2/scan`
pub async fn scan(
    State(service): State<Arc<ScanService>>,
    Query(query): Query<HostQuery>,
) -> Result<Json<ScanResponse>, ApiError> {
    let row = service.scan_summary(&query.host).await?;
    let details_url = details_url(&service, &row.site_key);
    Ok(Json(ScanResponse {
        scan: row,
        details_url,
    }))
}

/// `POST /api/v2/scanFullDetails`
pub async fn scan_full_details(
    State(service): State<Arc<ScanService>>,
    Query(query): Query<HostQuery>,
) -> Result<Json<FullDetailsResponse>, ApiError> {
    let (row, report) = service.scan_full_details(&query.host).await?;
    let details_url = details_url(&service, &row.site_key);
    Ok(Json(FullDetailsResponse {
        scan: row,
        full_details: report,
        details_url,
    }))
}

/// `GET /api/v2/analyze`
pub async fn analyze_get(
    State(service): State<Arc<ScanService>>,
    Query(query): Query<HostQuery>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let row = service.analyze_cached(&query.host).await?;
    let history = service.history(&query.host, HISTORY_LIMIT).await?;
    let details_url = details_url(&service, &row.site_key);
    Ok(Json(AnalyzeResponse {
        scan: row,
        history,
        full_details: None,
        details_url,
    }))
}

/// `POST /api/v2/analyze`
pub async fn analyze_post(
    State(service): State<Arc<ScanService>>,
    Query(query): Query<HostQuery>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let (row, report) = service.scan_full_details(&query.host).await?;
    let history = service.history(&query.host, HISTORY_LIMIT).await?;
    let details_url = details_url(&service, &row.site_key);
    Ok(Json(AnalyzeResponse {
        scan: row,
        history,
        full_details: Some(report),
        details_url,
    }))
}

/// `POST /api/v2/scanBatchFullDetails`
pub async fn scan_batch_full_details(
    State(service): State<Arc<ScanService>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload
        .map_err(|e| ApiError::unprocessable("invalid-request", e.body_text()))?;

    if body.urls.len() > MAX_BATCH_SIZE {
        return Err(ApiError::unprocessable(
            "invalid-request",
            format!(
                "batch accepts at most {MAX_BATCH_SIZE} urls, got {}",
                body.urls.len()
            ),
        ));
    }

    let entries = service.scan_batch(&body.urls).await;
    let results: BTreeMap<String, Value> = entries
        .into_iter()
        .map(|(key, entry)| {
            let value = match entry {
                BatchEntry::Ok { row, report } => json!({
                    "success": true,
                    "scan": row,
                    "full_details": report,
                }),
                BatchEntry::Err { error, message } => json!({
                    "success": false,
                    "error": error,
                    "message": message,
                }),
            };
            (key, value)
        })
        .collect();

    Ok(Json(json!({ "results": results })))
}

/// `GET /api/v2/stats`
pub async fn stats(
    State(service): State<Arc<ScanService>>,
) -> Result<Json<Value>, ApiError> {
    let stats = service.stats().await?;
    Ok(Json(serde_json::to_value(stats).unwrap_or_default()))
}
