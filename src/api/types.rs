//! API request and response types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_handling::ScanError;
use crate::scanner::ScanReport;
use crate::storage::ScanRow;

/// `?host=` query parameter.
#[derive(Debug, Deserialize)]
pub struct HostQuery {
    /// Host string to scan.
    pub host: String,
}

/// Body of `POST /api/v2/scanBatchFullDetails`.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Host strings to scan; at most `MAX_BATCH_SIZE`.
    pub urls: Vec<String>,
}

/// Summary response: the scan row plus a details link.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    /// Persisted (or cached) summary row.
    pub scan: ScanRow,
    /// Link to the analyze endpoint for this site, when a base URL is
    /// configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

/// Detail response: summary row plus a freshly computed full report.
#[derive(Debug, Serialize)]
pub struct FullDetailsResponse {
    /// Persisted (or cached) summary row.
    pub scan: ScanRow,
    /// Fresh in-memory scan with the complete tests map.
    pub full_details: ScanReport,
    /// Link to the analyze endpoint for this site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

/// Analyze response: row, history, and (for POST) full details.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    /// Persisted (or cached) summary row.
    pub scan: ScanRow,
    /// Prior scan rows for the site, newest first.
    pub history: Vec<ScanRow>,
    /// Fresh full report; only populated on POST.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_details: Option<ScanReport>,
    /// Link to this endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
}

/// `{error, message}` body with an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status for the response.
    pub status: StatusCode,
    /// Stable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// 422 response for a validation failure.
    pub fn unprocessable(error: &str, message: String) -> ApiError {
        ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: error.to_string(),
            message,
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> ApiError {
        match &e {
            // Validation failures are the caller's problem.
            ScanError::Validation(v) => ApiError::unprocessable(v.code(), v.to_string()),
            // Anything else that escapes as an error (cancellation,
            // storage trouble) is ours.
            ScanError::Retrieval(r) => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: r.code().to_string(),
                message: r.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.error, "message": self.message }));
        (self.status, body).into_response()
    }
}
