//! Error type definitions.

use thiserror::Error;

/// Rejections raised while canonicalizing the user-supplied host string.
///
/// These occur before any network traffic and map to HTTP 422 in the API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The input is empty, contains whitespace, fails the hostname grammar,
    /// or is a bare IP literal.
    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    /// DNS resolution produced no usable A/AAAA answer for the host.
    #[error("hostname did not resolve: {0}")]
    InvalidHostnameLookup(String),

    /// A port was present but outside 1..=65535.
    #[error("invalid port in: {0}")]
    InvalidPort(String),
}

impl ValidationError {
    /// Stable string code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidHostname(_) => "invalid-hostname",
            ValidationError::InvalidHostnameLookup(_) => "invalid-hostname-lookup",
            ValidationError::InvalidPort(_) => "invalid-port",
        }
    }
}

/// Failures raised by the retriever after validation succeeded.
///
/// These are persisted: the scan row carries the code in its `error` column
/// with grade and score null and an empty tests map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    /// The target refused or dropped every connection attempt.
    #[error("connection failed: {0}")]
    ConnectionError(String),

    /// The TLS handshake failed on the HTTPS probe.
    #[error("TLS failure: {0}")]
    TlsError(String),

    /// The redirect chain exceeded the configured hop limit.
    #[error("redirect chain exceeded {0} hops")]
    RedirectionLoop(usize),

    /// The scan hit its overall wall-clock cap.
    #[error("scan timed out after {0} seconds")]
    ScanTimeout(u64),

    /// The caller's cancellation token fired mid-scan.
    #[error("scan was cancelled")]
    ScanCancelled,

    /// Anything unexpected. The message is logged but kept out of public
    /// output.
    #[error("scan failed: {0}")]
    ScanFailed(String),
}

impl RetrievalError {
    /// Stable string code persisted in the scan row's `error` column.
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::ConnectionError(_) => "connection-error",
            RetrievalError::TlsError(_) => "tls-error",
            RetrievalError::RedirectionLoop(_) => "redirection-loop",
            RetrievalError::ScanTimeout(_) => "scan-timeout",
            RetrievalError::ScanCancelled => "scan-cancelled",
            RetrievalError::ScanFailed(_) => "scan-failed",
        }
    }

    /// Whether a failed scan row should be written for this error.
    ///
    /// Cancelled scans never leave a cached row behind.
    pub fn is_persistable(&self) -> bool {
        !matches!(self, RetrievalError::ScanCancelled)
    }
}

/// Union of everything that can abort a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

impl ScanError {
    /// Stable string code for the error, regardless of family.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::Validation(e) => e.code(),
            ScanError::Retrieval(e) => e.code(),
        }
    }
}
