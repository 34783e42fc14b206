//! Stored issues from the issue radar.
//!
//! Issues are keyed by `(repo, number)`. Re-discovery refreshes title, labels,
//! score and category in place; `discovered_at` keeps the first sighting.

use crate::error::{DatabaseError, Result};
use crate::store::{required_timestamp, ConflictPolicy, SqlValue, TableSpec};
use chrono::{DateTime, Utc};
use radar_core::Issue;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub(crate) static ISSUE_TABLE: TableSpec = TableSpec {
    table: "issues",
    key_columns: &["repo", "number"],
    key_filter: "repo",
    columns: &[
        "repo",
        "number",
        "title",
        "url",
        "labels",
        "created_at",
        "updated_at",
        "comments",
        "state",
        "author",
        "body",
        "score",
        "category",
        "discovered_at",
    ],
    keep_on_replace: &["discovered_at"],
    day_expr: "substr(discovered_at, 1, 10)",
    policy: ConflictPolicy::Replace,
};

pub(crate) fn issue_values(issue: &Issue, now: DateTime<Utc>) -> Result<Vec<SqlValue>> {
    let labels = serde_json::to_string(&issue.labels)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    Ok(vec![
        SqlValue::text(&issue.repository),
        SqlValue::Int(issue.number),
        SqlValue::text(&issue.title),
        SqlValue::text(&issue.url),
        SqlValue::text(labels),
        SqlValue::timestamp(Some(issue.created_at)),
        SqlValue::timestamp(Some(issue.updated_at)),
        SqlValue::Int(i64::from(issue.comments)),
        SqlValue::text(&issue.state),
        SqlValue::text(&issue.author),
        SqlValue::text(&issue.body),
        SqlValue::Real(issue.score),
        SqlValue::text(issue.category.as_str()),
        SqlValue::timestamp(Some(now)),
    ])
}

pub(crate) fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let labels: String = row.try_get("labels")?;
    let labels = serde_json::from_str(&labels)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    let comments: i64 = row.try_get("comments")?;
    let category: String = row.try_get("category")?;

    Ok(Issue {
        repository: row.try_get("repo")?,
        number: row.try_get("number")?,
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        labels,
        created_at: required_timestamp(row, "created_at")?,
        updated_at: required_timestamp(row, "updated_at")?,
        comments: u32::try_from(comments)
            .map_err(|_| DatabaseError::Decode(format!("invalid comment count {comments}")))?,
        state: row.try_get("state")?,
        author: row.try_get("author")?,
        body: row.try_get("body")?,
        score: row.try_get("score")?,
        category: category.parse()?,
    })
}

/// Highest-scoring open issues, best first.
pub async fn top_issues(pool: &Pool<Sqlite>, limit: u32) -> Result<Vec<Issue>> {
    let rows = sqlx::query(
        "SELECT * FROM issues
         WHERE state = 'open'
         ORDER BY score DESC, updated_at DESC
         LIMIT ?",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.iter().map(issue_from_row).collect()
}

/// When an issue was first stored.
pub async fn discovered_at(
    pool: &Pool<Sqlite>,
    repository: &str,
    number: i64,
) -> Result<Option<DateTime<Utc>>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT discovered_at FROM issues WHERE repo = ? AND number = ?")
            .bind(repository)
            .bind(number)
            .fetch_optional(pool)
            .await?;

    crate::store::parse_timestamp(value)
}
