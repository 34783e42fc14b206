//! Snapshot store with per-table conflict policies.
//!
//! Every stored record has a natural key backed by a `UNIQUE` constraint. On
//! conflict, `Replace` tables overwrite the existing row in place and `Ignore`
//! tables keep it untouched. SQLite applies each upsert atomically, so two
//! writers racing on the same key still leave exactly one row.

use crate::audit_log::{self, CollectionLogEntry, ScanLogEntry};
use crate::error::{DatabaseError, Result};
use crate::snapshots::{ContributionSnapshot, PackageSnapshot, ProfileSnapshot, RepositorySnapshot};
use chrono::{DateTime, NaiveDate, Utc};
use radar_core::{Finding, Issue, MetricType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};

/// What happens when a record collides with an existing natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Overwrite the stored values
    Replace,
    /// Keep the stored row
    Ignore,
}

/// Result of saving one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No row existed for the key
    Inserted,
    /// An existing row was overwritten
    Replaced,
    /// An existing row was kept
    Ignored,
}

/// Kind of stored record, one per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// `profile_snapshots`
    Profile,
    /// `contribution_snapshots`
    Contribution,
    /// `repository_snapshots`
    Repository,
    /// `package_snapshots`
    Package,
    /// `issues`
    Issue,
    /// `findings`
    Finding,
}

/// Static description of a table's shape.
pub(crate) struct TableSpec {
    pub table: &'static str,
    /// Natural key, matching the table's `UNIQUE` constraint
    pub key_columns: &'static [&'static str],
    /// Column used for key and prefix filters
    pub key_filter: &'static str,
    /// Insert columns, in the order `values` produces them
    pub columns: &'static [&'static str],
    /// Columns left untouched when a row is replaced
    pub keep_on_replace: &'static [&'static str],
    /// SQL expression yielding the `YYYY-MM-DD` day of a row
    pub day_expr: &'static str,
    pub policy: ConflictPolicy,
}

impl TableSpec {
    /// Columns accepted in `ORDER BY`.
    fn orderable(&self, column: &str) -> bool {
        column == "id" || self.columns.iter().any(|c| *c == column)
    }

    fn insert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        let conflict = match self.policy {
            ConflictPolicy::Ignore => "DO NOTHING".to_string(),
            ConflictPolicy::Replace => {
                let updates: Vec<String> = self
                    .columns
                    .iter()
                    .filter(|c| !self.key_columns.contains(*c) && !self.keep_on_replace.contains(*c))
                    .map(|c| format!("{c} = excluded.{c}"))
                    .collect();
                format!("DO UPDATE SET {}", updates.join(", "))
            }
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            self.table,
            self.columns.join(", "),
            placeholders,
            self.key_columns.join(", "),
            conflict
        )
    }

    fn insert_new_sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO NOTHING",
            self.table,
            self.columns.join(", "),
            vec!["?"; self.columns.len()].join(", "),
            self.key_columns.join(", ")
        )
    }
}

impl RecordKind {
    pub(crate) fn spec(self) -> &'static TableSpec {
        match self {
            Self::Profile => &crate::snapshots::PROFILE_TABLE,
            Self::Contribution => &crate::snapshots::CONTRIBUTION_TABLE,
            Self::Repository => &crate::snapshots::REPOSITORY_TABLE,
            Self::Package => &crate::snapshots::PACKAGE_TABLE,
            Self::Issue => &crate::issues::ISSUE_TABLE,
            Self::Finding => &crate::findings::FINDING_TABLE,
        }
    }

    /// Table backing this kind.
    #[must_use]
    pub fn table(self) -> &'static str {
        self.spec().table
    }

    /// Conflict policy applied by `save`.
    #[must_use]
    pub fn policy(self) -> ConflictPolicy {
        self.spec().policy
    }

    fn decode(self, row: &SqliteRow) -> Result<StoredRecord> {
        Ok(match self {
            Self::Profile => StoredRecord::Profile(ProfileSnapshot::from_row(row)?),
            Self::Contribution => StoredRecord::Contribution(ContributionSnapshot::from_row(row)?),
            Self::Repository => StoredRecord::Repository(RepositorySnapshot::from_row(row)?),
            Self::Package => StoredRecord::Package(PackageSnapshot::from_row(row)?),
            Self::Issue => StoredRecord::Issue(crate::issues::issue_from_row(row)?),
            Self::Finding => StoredRecord::Finding(crate::findings::finding_from_row(row)?),
        })
    }
}

/// Any record the store persists.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    /// Daily account profile totals
    Profile(ProfileSnapshot),
    /// Daily contribution counts
    Contribution(ContributionSnapshot),
    /// Daily per-repository statistics
    Repository(RepositorySnapshot),
    /// Daily package statistics
    Package(PackageSnapshot),
    /// Scored open issue
    Issue(Issue),
    /// Vulnerability pattern match
    Finding(Finding),
}

impl StoredRecord {
    /// Table kind of this record.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Profile(_) => RecordKind::Profile,
            Self::Contribution(_) => RecordKind::Contribution,
            Self::Repository(_) => RecordKind::Repository,
            Self::Package(_) => RecordKind::Package,
            Self::Issue(_) => RecordKind::Issue,
            Self::Finding(_) => RecordKind::Finding,
        }
    }

    fn values(&self, now: DateTime<Utc>) -> Result<Vec<SqlValue>> {
        match self {
            Self::Profile(s) => Ok(s.values(now)),
            Self::Contribution(s) => Ok(s.values(now)),
            Self::Repository(s) => s.values(now),
            Self::Package(s) => Ok(s.values(now)),
            Self::Issue(issue) => crate::issues::issue_values(issue, now),
            Self::Finding(finding) => Ok(crate::findings::finding_values(finding, now)),
        }
    }
}

impl From<ProfileSnapshot> for StoredRecord {
    fn from(s: ProfileSnapshot) -> Self {
        Self::Profile(s)
    }
}

impl From<ContributionSnapshot> for StoredRecord {
    fn from(s: ContributionSnapshot) -> Self {
        Self::Contribution(s)
    }
}

impl From<RepositorySnapshot> for StoredRecord {
    fn from(s: RepositorySnapshot) -> Self {
        Self::Repository(s)
    }
}

impl From<PackageSnapshot> for StoredRecord {
    fn from(s: PackageSnapshot) -> Self {
        Self::Package(s)
    }
}

impl From<Issue> for StoredRecord {
    fn from(issue: Issue) -> Self {
        Self::Issue(issue)
    }
}

impl From<Finding> for StoredRecord {
    fn from(finding: Finding) -> Self {
        Self::Finding(finding)
    }
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlValue {
    Text(Option<String>),
    Int(i64),
    Real(f64),
}

impl SqlValue {
    pub(crate) fn text(value: impl Into<String>) -> Self {
        Self::Text(Some(value.into()))
    }

    pub(crate) fn opt_text(value: Option<&str>) -> Self {
        Self::Text(value.map(String::from))
    }

    pub(crate) fn timestamp(value: Option<DateTime<Utc>>) -> Self {
        Self::Text(value.map(|t| t.to_rfc3339()))
    }

    pub(crate) fn day(value: NaiveDate) -> Self {
        Self::Text(Some(format_day(value)))
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_all(mut query: SqliteQuery<'_>, values: Vec<SqlValue>) -> SqliteQuery<'_> {
    for value in values {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Real(v) => query.bind(v),
        };
    }
    query
}

/// Format a snapshot day as stored.
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Decode(format!("invalid snapshot date '{value}': {e}")))
}

pub(crate) fn parse_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{v}': {e}")))
        })
        .transpose()
}

pub(crate) fn required_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(row.try_get(column)?)?
        .ok_or_else(|| DatabaseError::Decode(format!("missing timestamp in column {column}")))
}

/// Filter and ordering for [`SnapshotStore::query`].
#[derive(Debug, Clone)]
pub struct SnapshotQuery {
    /// Table to read
    pub kind: RecordKind,
    /// Exact natural key (first key column)
    pub key: Option<String>,
    /// Natural key prefix
    pub key_prefix: Option<String>,
    /// First day included
    pub day_from: Option<NaiveDate>,
    /// Last day included
    pub day_to: Option<NaiveDate>,
    /// Column to order by; must belong to the table
    pub order_by: Option<String>,
    /// Descending order
    pub descending: bool,
    /// Maximum rows returned
    pub limit: Option<u32>,
}

impl SnapshotQuery {
    /// Unfiltered query over one table.
    #[must_use]
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            key: None,
            key_prefix: None,
            day_from: None,
            day_to: None,
            order_by: None,
            descending: false,
            limit: None,
        }
    }

    /// Only rows with this natural key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Only rows whose natural key starts with `prefix`.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Only rows within the inclusive day range.
    #[must_use]
    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.day_from = from;
        self.day_to = to;
        self
    }

    /// Order by `column`.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(column.into());
        self.descending = descending;
        self
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Persistent store for snapshots, issues, findings and the audit trail.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pool: Pool<Sqlite>,
}

impl SnapshotStore {
    /// Wrap an open, migrated pool.
    #[must_use]
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Save one record under its table's conflict policy.
    pub async fn save(&self, record: &StoredRecord) -> Result<SaveOutcome> {
        let spec = record.kind().spec();
        let values = record.values(Utc::now())?;

        // The first statement is a write, so the transaction takes the write
        // lock before reading and lock contention waits on the busy timeout.
        let mut tx = self.pool.begin().await?;

        let inserted = bind_all(sqlx::query(&spec.insert_new_sql()), values.clone())
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let outcome = match (inserted, spec.policy) {
            (true, _) => SaveOutcome::Inserted,
            (false, ConflictPolicy::Replace) => {
                bind_all(sqlx::query(&spec.insert_sql()), values)
                    .execute(&mut *tx)
                    .await?;
                SaveOutcome::Replaced
            }
            (false, ConflictPolicy::Ignore) => SaveOutcome::Ignored,
        };

        tx.commit().await?;

        tracing::trace!("Saved {:?} record: {:?}", record.kind(), outcome);
        Ok(outcome)
    }

    /// Save a batch, returning how many rows were newly inserted.
    pub async fn save_all<I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = StoredRecord>,
    {
        let mut inserted = 0;
        for record in records {
            if self.save(&record).await? == SaveOutcome::Inserted {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Read records matching `query`.
    pub async fn query(&self, query: &SnapshotQuery) -> Result<Vec<StoredRecord>> {
        let spec = query.kind.spec();

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE 1 = 1", spec.table));

        if let Some(key) = &query.key {
            builder.push(format!(" AND {} = ", spec.key_filter));
            builder.push_bind(key.clone());
        }
        if let Some(prefix) = &query.key_prefix {
            builder.push(format!(" AND {} LIKE ", spec.key_filter));
            builder.push_bind(format!("{}%", escape_like(prefix)));
            builder.push(" ESCAPE '\\'");
        }
        if let Some(from) = query.day_from {
            builder.push(format!(" AND {} >= ", spec.day_expr));
            builder.push_bind(format_day(from));
        }
        if let Some(to) = query.day_to {
            builder.push(format!(" AND {} <= ", spec.day_expr));
            builder.push_bind(format_day(to));
        }

        let order = query.order_by.as_deref().unwrap_or("id");
        if !spec.orderable(order) {
            return Err(DatabaseError::InvalidQuery(format!(
                "cannot order {} by '{order}'",
                spec.table
            )));
        }
        let direction = if query.descending { "DESC" } else { "ASC" };
        builder.push(format!(" ORDER BY {order} {direction}, id {direction}"));

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(|row| query.kind.decode(row)).collect()
    }

    /// Most recent snapshot for `key`, by snapshot day.
    pub async fn latest(&self, kind: RecordKind, key: &str) -> Result<Option<StoredRecord>> {
        let column = match kind {
            RecordKind::Issue | RecordKind::Finding => "discovered_at",
            _ => "snapshot_date",
        };
        let mut records = self
            .query(&SnapshotQuery::new(kind).key(key).order_by(column, true).limit(1))
            .await?;
        Ok(records.pop())
    }

    /// Highest-scoring stored issues.
    pub async fn top_issues(&self, limit: u32) -> Result<Vec<Issue>> {
        crate::issues::top_issues(&self.pool, limit).await
    }

    /// Findings ordered from most to least severe.
    pub async fn findings_by_severity(&self, limit: u32) -> Result<Vec<Finding>> {
        crate::findings::findings_by_severity(&self.pool, limit).await
    }

    /// Append an entry to the issue scan log.
    pub async fn log_scan(
        &self,
        repository: &str,
        issues_found: usize,
        status: &str,
        error: Option<&str>,
    ) -> Result<()> {
        audit_log::log_scan(&self.pool, repository, issues_found, status, error).await
    }

    /// Append an entry to the collection log.
    pub async fn log_collection(
        &self,
        run_id: Option<&str>,
        metric_type: MetricType,
        target: &str,
        status: &str,
        error: Option<&str>,
    ) -> Result<()> {
        audit_log::log_collection(&self.pool, run_id, metric_type, target, status, error).await
    }

    /// Most recent scan log entries.
    pub async fn recent_scans(&self, limit: u32) -> Result<Vec<ScanLogEntry>> {
        audit_log::recent_scans(&self.pool, limit).await
    }

    /// Most recent collection log entries.
    pub async fn recent_collections(&self, limit: u32) -> Result<Vec<CollectionLogEntry>> {
        audit_log::recent_collections(&self.pool, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_sql_preserves_keys_and_kept_columns() {
        let sql = crate::issues::ISSUE_TABLE.insert_sql();
        assert!(sql.starts_with("INSERT INTO issues (repo, number"));
        assert!(sql.contains("ON CONFLICT(repo, number) DO UPDATE SET"));
        assert!(sql.contains("score = excluded.score"));
        assert!(!sql.contains("discovered_at = excluded"));
        assert!(!sql.contains("repo = excluded"));
    }

    #[test]
    fn test_insert_new_sql_never_updates() {
        let sql = crate::snapshots::PROFILE_TABLE.insert_new_sql();
        assert!(sql.starts_with("INSERT INTO profile_snapshots ("));
        assert!(sql.ends_with("DO NOTHING"));
        assert!(!sql.contains("DO UPDATE"));
    }

    #[test]
    fn test_ignore_sql() {
        let sql = crate::findings::FINDING_TABLE.insert_sql();
        assert!(sql.ends_with("ON CONFLICT(repo, file_path, line_number, finding_type) DO NOTHING"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("octo_cat%"), "octo\\_cat\\%");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_policies() {
        assert_eq!(RecordKind::Profile.policy(), ConflictPolicy::Replace);
        assert_eq!(RecordKind::Issue.policy(), ConflictPolicy::Replace);
        assert_eq!(RecordKind::Finding.policy(), ConflictPolicy::Ignore);
    }
}
