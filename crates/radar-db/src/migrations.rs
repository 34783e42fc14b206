//! Database migration management.
//!
//! SQL migrations under `migrations/` are embedded at compile time and applied
//! through `SQLx`'s migrator, which records applied versions in
//! `_sqlx_migrations`.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Run all pending database migrations.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Get the current schema version.
///
/// Returns 0 if no migrations have been applied yet.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let table_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?
        > 0;

    if !table_exists {
        return Ok(0);
    }

    let version =
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = connect(":memory:").await.expect("create pool");

        run_migrations(&pool).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name"
        )
        .fetch_all(&pool)
        .await
        .expect("query tables");

        assert_eq!(
            tables,
            vec![
                "collection_log",
                "contribution_snapshots",
                "findings",
                "issues",
                "package_snapshots",
                "profile_snapshots",
                "repository_snapshots",
                "scan_log",
            ]
        );
    }

    #[tokio::test]
    async fn test_get_schema_version() {
        let pool = connect(":memory:").await.expect("create pool");

        let version = get_schema_version(&pool).await.expect("get version");
        assert_eq!(version, 0);

        run_migrations(&pool).await.expect("run migrations");

        let version = get_schema_version(&pool).await.expect("get version");
        assert_eq!(version, 3);
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let pool = connect(":memory:").await.expect("create pool");

        run_migrations(&pool).await.expect("first migration run");
        run_migrations(&pool)
            .await
            .expect("second migration run should be idempotent");

        let version = get_schema_version(&pool).await.expect("get version");
        assert_eq!(version, 3);
    }
}
