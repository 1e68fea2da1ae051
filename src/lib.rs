//! site_grader: HTTP response-header security scanning and grading.
//!
//! Evaluates a website's security-header posture and produces a
//! deterministic scorecard: per-test outcomes, an aggregate score, and a
//! letter grade. Data flows one way through four layers:
//!
//! ```text
//! user string -> Site -> Requests -> {TestResult} -> ScanReport
//! ```
//!
//! The retriever is the only layer that touches the network; the test
//! battery and grader are pure functions over the retrieved snapshot.
//!
//! # Example
//!
//! ```no_run
//! use site_grader::harness::RequestsBuilder;
//! use site_grader::scanner;
//! use std::collections::HashMap;
//!
//! let requests = RequestsBuilder::new("example.com")
//!     .headers(&[("x-frame-options", "DENY")])
//!     .build();
//! let results = scanner::run_battery(&requests, &HashMap::new());
//! let report = scanner::build_report(&requests, results, chrono::Utc::now());
//! println!("{}", report.grade.as_deref().unwrap_or("-"));
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod harness;
pub mod retriever;
pub mod scanner;
pub mod service;
pub mod site;
pub mod storage;

pub use config::Config;
pub use error_handling::{RetrievalError, ScanError, ValidationError};
pub use retriever::{Requests, Retrieve, Retriever};
pub use scanner::{Outcome, ScanReport, TestResult, ALGORITHM_VERSION};
pub use service::{ScanOutcome, ScanService};
pub use site::Site;
