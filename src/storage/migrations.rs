//! Embedded SQLx migrations.
//!
//! Migrations are compiled into the binary and extracted to a temporary
//! directory at runtime, so distributed binaries migrate without shipping
//! the migrations directory alongside.

use include_dir::{include_dir, Dir};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

/// Runs all pending migrations.
///
/// Uses the source migrations directory when it exists (development), the
/// embedded copy otherwise.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), anyhow::Error> {
    let source_migrations = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");

    if source_migrations.exists() {
        let migrator = sqlx::migrate::Migrator::new(source_migrations.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    } else {
        // The temp dir must outlive the migrator run.
        let temp_dir = TempDir::new()?;
        let migrations_path = temp_dir.path().join("migrations");
        std::fs::create_dir_all(&migrations_path)?;

        for file in MIGRATIONS_DIR.files() {
            let file_path = migrations_path.join(file.path());
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&file_path, file.contents())?;
        }

        let migrator = sqlx::migrate::Migrator::new(migrations_path.as_path()).await?;
        migrator.run(pool).await?;
        Ok(())
    }
}
