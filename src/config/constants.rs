//! Configuration constants.
//!
//! All operational parameters live here: timeouts, size caps, redirect and
//! batch limits, and the default cache windows.

use std::time::Duration;

/// Per-probe HTTP timeout in seconds.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Overall wall-clock cap for one scan. The retriever issues several probes;
/// this bounds the sum regardless of how slowly each one fails.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// DNS query timeout in seconds for the resolution pre-flight.
pub const DNS_TIMEOUT_SECS: u64 = 3;

/// Maximum number of redirect hops followed on the HTTPS probe.
/// Exceeding the cap fails the scan with `redirection-loop`.
pub const MAX_REDIRECT_HOPS: usize = 20;

/// Maximum response body size read for HTML analysis (256 KiB).
/// The CSP-meta and SRI tests only ever see this bounded prefix.
pub const MAX_RESPONSE_BODY_SIZE: usize = 256 * 1024;

/// Maximum size for well-known resource probes (robots.txt, crossdomain.xml,
/// clientaccesspolicy.xml).
pub const MAX_WELL_KNOWN_BODY_SIZE: usize = 64 * 1024;

/// Minimum interval between two retrievals for the same site key. Requests
/// inside the window are served the cached row.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Cache age accepted by `GET /api/v2/analyze` before a fresh scan runs.
pub const DEFAULT_GET_CACHE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum number of URLs accepted per batch request.
pub const MAX_BATCH_SIZE: usize = 10;

/// Maximum in-flight scans while draining a batch.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Stable user agent sent on every probe.
pub const SCANNER_USER_AGENT: &str = concat!("site-grader/", env!("CARGO_PKG_VERSION"));

/// Default SQLite database path for the API server.
pub const DEFAULT_DB_PATH: &str = "./site_grader.db";

/// Environment variable holding the public base URL used to build
/// `details_url` fields in API responses.
pub const BASE_URL_ENV: &str = "HTTPOBS_BASE_URL";

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "SITE_GRADER_DB_PATH";
