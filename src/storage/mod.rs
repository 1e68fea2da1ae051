//! Scan persistence: summary rows, expectation overrides, and corpus
//! statistics.
//!
//! Only summaries are stored; detail endpoints re-scan to produce full test
//! results. SQLite with WAL mode, embedded migrations.

mod insert;
mod migrations;
mod models;
mod pool;

pub use insert::{
    grade_distribution, insert_scan, latest_scan, load_expectation_overrides, scan_history,
    GradeStats,
};
pub use migrations::run_migrations;
pub use models::ScanRow;
pub use pool::init_db_pool_with_path;
