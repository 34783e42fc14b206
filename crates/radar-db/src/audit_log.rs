//! Append-only audit trail of scans and collections.
//!
//! Rows are never updated or deduplicated; every attempt leaves one entry.

use crate::error::Result;
use crate::store::required_timestamp;
use chrono::{DateTime, Utc};
use radar_core::MetricType;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// One issue radar scan of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    /// Row id
    pub id: i64,
    /// Repository scanned
    pub repository: String,
    /// When the scan finished
    pub scanned_at: DateTime<Utc>,
    /// Issues stored by the scan
    pub issues_found: i64,
    /// `success`, `partial` or `failed`
    pub status: String,
    /// Error message for unsuccessful scans
    pub error_message: Option<String>,
}

/// One metric collection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLogEntry {
    /// Row id
    pub id: i64,
    /// Collection cycle the attempt belonged to
    pub run_id: Option<String>,
    /// Metric collected
    pub metric_type: String,
    /// Username, repository or package collected
    pub target: String,
    /// `success`, `partial` or `failed`
    pub status: String,
    /// Error message for unsuccessful attempts
    pub error_message: Option<String>,
    /// When the attempt finished
    pub collected_at: DateTime<Utc>,
}

/// Record an issue radar scan.
pub async fn log_scan(
    pool: &Pool<Sqlite>,
    repository: &str,
    issues_found: usize,
    status: &str,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO scan_log (repo, scanned_at, issues_found, status, error_message)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(repository)
    .bind(Utc::now().to_rfc3339())
    .bind(i64::try_from(issues_found).unwrap_or(i64::MAX))
    .bind(status)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a metric collection attempt.
pub async fn log_collection(
    pool: &Pool<Sqlite>,
    run_id: Option<&str>,
    metric_type: MetricType,
    target: &str,
    status: &str,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO collection_log (run_id, metric_type, target, status, error_message, collected_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(run_id)
    .bind(metric_type.as_str())
    .bind(target)
    .bind(status)
    .bind(error)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

fn scan_from_row(row: &SqliteRow) -> Result<ScanLogEntry> {
    Ok(ScanLogEntry {
        id: row.try_get("id")?,
        repository: row.try_get("repo")?,
        scanned_at: required_timestamp(row, "scanned_at")?,
        issues_found: row.try_get("issues_found")?,
        status: row.try_get("status")?,
        error_message: row.try_get("error_message")?,
    })
}

fn collection_from_row(row: &SqliteRow) -> Result<CollectionLogEntry> {
    Ok(CollectionLogEntry {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        metric_type: row.try_get("metric_type")?,
        target: row.try_get("target")?,
        status: row.try_get("status")?,
        error_message: row.try_get("error_message")?,
        collected_at: required_timestamp(row, "collected_at")?,
    })
}

/// Most recent scans, newest first.
pub async fn recent_scans(pool: &Pool<Sqlite>, limit: u32) -> Result<Vec<ScanLogEntry>> {
    let rows = sqlx::query("SELECT * FROM scan_log ORDER BY id DESC LIMIT ?")
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.iter().map(scan_from_row).collect()
}

/// Most recent collection attempts, newest first.
pub async fn recent_collections(
    pool: &Pool<Sqlite>,
    limit: u32,
) -> Result<Vec<CollectionLogEntry>> {
    let rows = sqlx::query("SELECT * FROM collection_log ORDER BY id DESC LIMIT ?")
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

    rows.iter().map(collection_from_row).collect()
}

/// Collection attempts belonging to one run, oldest first.
pub async fn collections_for_run(
    pool: &Pool<Sqlite>,
    run_id: &str,
) -> Result<Vec<CollectionLogEntry>> {
    let rows = sqlx::query("SELECT * FROM collection_log WHERE run_id = ? ORDER BY id")
        .bind(run_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(collection_from_row).collect()
}
