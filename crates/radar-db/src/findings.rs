//! Stored vulnerability findings.
//!
//! Findings are insert-or-ignore on `(repo, file_path, line_number,
//! finding_type)`: the evidence captured on first discovery is never
//! overwritten by later scans.

use crate::error::Result;
use crate::store::{ConflictPolicy, SqlValue, TableSpec};
use chrono::{DateTime, Utc};
use radar_core::Finding;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub(crate) static FINDING_TABLE: TableSpec = TableSpec {
    table: "findings",
    key_columns: &["repo", "file_path", "line_number", "finding_type"],
    key_filter: "repo",
    columns: &[
        "repo",
        "file_path",
        "line_number",
        "finding_type",
        "severity",
        "title",
        "description",
        "cwe_id",
        "evidence",
        "confidence",
        "discovered_at",
    ],
    keep_on_replace: &["discovered_at"],
    day_expr: "substr(discovered_at, 1, 10)",
    policy: ConflictPolicy::Ignore,
};

pub(crate) fn finding_values(finding: &Finding, now: DateTime<Utc>) -> Vec<SqlValue> {
    vec![
        SqlValue::text(&finding.repository),
        SqlValue::text(&finding.file_path),
        SqlValue::Int(i64::from(finding.line_number)),
        SqlValue::text(finding.finding_type.as_str()),
        SqlValue::text(finding.severity.as_str()),
        SqlValue::text(&finding.title),
        SqlValue::text(&finding.description),
        SqlValue::opt_text(finding.cwe_id.as_deref()),
        SqlValue::text(&finding.evidence),
        SqlValue::text(finding.confidence.as_str()),
        SqlValue::timestamp(Some(now)),
    ]
}

pub(crate) fn finding_from_row(row: &SqliteRow) -> Result<Finding> {
    let line_number: i64 = row.try_get("line_number")?;
    let finding_type: String = row.try_get("finding_type")?;
    let severity: String = row.try_get("severity")?;
    let confidence: String = row.try_get("confidence")?;

    Ok(Finding {
        repository: row.try_get("repo")?,
        file_path: row.try_get("file_path")?,
        line_number: u32::try_from(line_number).map_err(|_| {
            crate::error::DatabaseError::Decode(format!("invalid line number {line_number}"))
        })?,
        finding_type: finding_type.parse()?,
        severity: severity.parse()?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        cwe_id: row.try_get("cwe_id")?,
        evidence: row.try_get("evidence")?,
        confidence: confidence.parse()?,
    })
}

/// Findings ordered critical first, then by repository and location.
pub async fn findings_by_severity(pool: &Pool<Sqlite>, limit: u32) -> Result<Vec<Finding>> {
    let rows = sqlx::query(
        "SELECT * FROM findings
         ORDER BY CASE severity
             WHEN 'critical' THEN 0
             WHEN 'high' THEN 1
             WHEN 'medium' THEN 2
             WHEN 'low' THEN 3
             ELSE 4
         END, repo, file_path, line_number
         LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(finding_from_row).collect()
}

/// Finding counts per repository, largest first.
pub async fn counts_by_repository(pool: &Pool<Sqlite>) -> Result<Vec<(String, i64)>> {
    let counts = sqlx::query_as::<_, (String, i64)>(
        "SELECT repo, COUNT(*) FROM findings GROUP BY repo ORDER BY COUNT(*) DESC, repo",
    )
    .fetch_all(pool)
    .await?;

    Ok(counts)
}
