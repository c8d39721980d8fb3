use crate::config::DatabaseConfig;
use crate::error::AppResult;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    ensure_sqlite_parent_dir(&config.url);

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false);

    let pool = Database::connect(options).await?;
    Ok(pool)
}

/// Applies pending migrations, or rebuilds the schema from scratch when `reset` is set.
pub async fn run_migrations(pool: &DbPool, reset: bool) -> AppResult<()> {
    if reset {
        log::warn!("Resetting database schema, all existing data is dropped");
        Migrator::fresh(pool).await?;
    } else {
        Migrator::up(pool, None).await?;
    }
    Ok(())
}

/// SQLite will not create missing directories for a file-backed database.
fn ensure_sqlite_parent_dir(url: &str) {
    let Some(path) = sqlite_file_path(url) else {
        return;
    };
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        log::warn!("Failed to create database directory {}: {e}", parent.display());
    }
}

fn sqlite_file_path(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}
