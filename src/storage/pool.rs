//! Database connection pool management.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::{error, info};
use sqlx::{Pool, Sqlite, SqlitePool};

/// Initializes a SQLite pool at the given path.
///
/// Creates the database file if needed and enables WAL mode for concurrent
/// access.
pub async fn init_db_pool_with_path(db_path: &Path) -> anyhow::Result<Arc<Pool<Sqlite>>> {
    let db_path_str = db_path.to_string_lossy().to_string();
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&db_path_str)
    {
        Ok(_) => info!("Database file created."),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            info!("Database file already exists.")
        }
        Err(e) => {
            error!("Failed to create database file: {e}");
            return Err(e).context("Failed to create database file");
        }
    }

    let pool = SqlitePool::connect(&format!("sqlite:{db_path_str}"))
        .await
        .context("Failed to connect to database")?;

    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .context("Failed to enable WAL mode")?;

    Ok(Arc::new(pool))
}
