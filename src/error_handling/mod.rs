//! Error types for scan validation, retrieval, and persistence.
//!
//! Two families of failures exist:
//! - Validation errors reject the input before any probe runs. They are
//!   surfaced to API callers as HTTP 422 and are never persisted.
//! - Retrieval errors abort a scan after validation. They are persisted as a
//!   scan row with `error` set and a null grade/score.
//!
//! Every variant carries a stable string code that appears verbatim in API
//! responses and persisted rows.

mod types;

pub use types::{RetrievalError, ScanError, ValidationError};
