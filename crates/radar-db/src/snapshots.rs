//! Daily metric snapshot records.
//!
//! Each snapshot is keyed by its natural key plus the day it was taken. Saving
//! the same key twice on one day replaces the earlier values.

use crate::error::{DatabaseError, Result};
use crate::store::{parse_day, parse_timestamp, ConflictPolicy, SqlValue, TableSpec};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub(crate) static PROFILE_TABLE: TableSpec = TableSpec {
    table: "profile_snapshots",
    key_columns: &["username", "snapshot_date"],
    key_filter: "username",
    columns: &[
        "username",
        "public_repos",
        "total_stars",
        "total_forks",
        "followers",
        "following",
        "public_gists",
        "bio",
        "company",
        "location",
        "hireable",
        "created_at",
        "updated_at",
        "snapshot_date",
        "collected_at",
    ],
    keep_on_replace: &[],
    day_expr: "snapshot_date",
    policy: ConflictPolicy::Replace,
};

pub(crate) static CONTRIBUTION_TABLE: TableSpec = TableSpec {
    table: "contribution_snapshots",
    key_columns: &["username", "snapshot_date"],
    key_filter: "username",
    columns: &[
        "username",
        "prs_opened",
        "prs_merged",
        "prs_closed",
        "issues_opened",
        "issues_closed",
        "commits_total",
        "reviews_given",
        "repositories_contributed_to",
        "snapshot_date",
        "collected_at",
    ],
    keep_on_replace: &[],
    day_expr: "snapshot_date",
    policy: ConflictPolicy::Replace,
};

pub(crate) static REPOSITORY_TABLE: TableSpec = TableSpec {
    table: "repository_snapshots",
    key_columns: &["full_name", "snapshot_date"],
    key_filter: "full_name",
    columns: &[
        "owner",
        "name",
        "full_name",
        "stars",
        "forks",
        "watchers",
        "open_issues",
        "language",
        "description",
        "homepage",
        "topics",
        "is_fork",
        "created_at",
        "updated_at",
        "pushed_at",
        "snapshot_date",
        "collected_at",
    ],
    keep_on_replace: &[],
    day_expr: "snapshot_date",
    policy: ConflictPolicy::Replace,
};

pub(crate) static PACKAGE_TABLE: TableSpec = TableSpec {
    table: "package_snapshots",
    key_columns: &["package_name", "snapshot_date"],
    key_filter: "package_name",
    columns: &[
        "package_name",
        "version",
        "downloads_last_day",
        "downloads_last_week",
        "downloads_last_month",
        "total_releases",
        "first_release_date",
        "latest_release_date",
        "requires_python",
        "author",
        "summary",
        "snapshot_date",
        "collected_at",
    ],
    keep_on_replace: &[],
    day_expr: "snapshot_date",
    policy: ConflictPolicy::Replace,
};

/// Account profile totals for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Account login
    pub username: String,
    /// Public repository count reported by the profile
    pub public_repos: i64,
    /// Stars across owned, non-fork repositories
    pub total_stars: i64,
    /// Forks across owned, non-fork repositories
    pub total_forks: i64,
    /// Follower count
    pub followers: i64,
    /// Following count
    pub following: i64,
    /// Public gist count
    pub public_gists: i64,
    /// Profile bio
    pub bio: Option<String>,
    /// Company field
    pub company: Option<String>,
    /// Location field
    pub location: Option<String>,
    /// Open to work flag
    pub hireable: bool,
    /// Account creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last profile update
    pub updated_at: Option<DateTime<Utc>>,
    /// Day the snapshot covers
    pub snapshot_date: NaiveDate,
}

impl ProfileSnapshot {
    pub(crate) fn values(&self, now: DateTime<Utc>) -> Vec<SqlValue> {
        vec![
            SqlValue::text(&self.username),
            SqlValue::Int(self.public_repos),
            SqlValue::Int(self.total_stars),
            SqlValue::Int(self.total_forks),
            SqlValue::Int(self.followers),
            SqlValue::Int(self.following),
            SqlValue::Int(self.public_gists),
            SqlValue::opt_text(self.bio.as_deref()),
            SqlValue::opt_text(self.company.as_deref()),
            SqlValue::opt_text(self.location.as_deref()),
            SqlValue::Int(i64::from(self.hireable)),
            SqlValue::timestamp(self.created_at),
            SqlValue::timestamp(self.updated_at),
            SqlValue::day(self.snapshot_date),
            SqlValue::timestamp(Some(now)),
        ]
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            username: row.try_get("username")?,
            public_repos: row.try_get("public_repos")?,
            total_stars: row.try_get("total_stars")?,
            total_forks: row.try_get("total_forks")?,
            followers: row.try_get("followers")?,
            following: row.try_get("following")?,
            public_gists: row.try_get("public_gists")?,
            bio: row.try_get("bio")?,
            company: row.try_get("company")?,
            location: row.try_get("location")?,
            hireable: row.try_get::<i64, _>("hireable")? != 0,
            created_at: parse_timestamp(row.try_get("created_at")?)?,
            updated_at: parse_timestamp(row.try_get("updated_at")?)?,
            snapshot_date: parse_day(&row.try_get::<String, _>("snapshot_date")?)?,
        })
    }
}

/// Contribution counts over the lookback window, taken on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionSnapshot {
    /// Account login
    pub username: String,
    /// Pull requests opened
    pub prs_opened: i64,
    /// Pull requests merged
    pub prs_merged: i64,
    /// Pull requests closed, merged ones included
    pub prs_closed: i64,
    /// Issues opened
    pub issues_opened: i64,
    /// Issues closed
    pub issues_closed: i64,
    /// Commits pushed, as far back as the public event feed reaches
    pub commits_total: i64,
    /// Pull requests reviewed
    pub reviews_given: i64,
    /// Distinct repositories with a merged pull request
    pub repositories_contributed_to: i64,
    /// Day the snapshot covers
    pub snapshot_date: NaiveDate,
}

impl ContributionSnapshot {
    pub(crate) fn values(&self, now: DateTime<Utc>) -> Vec<SqlValue> {
        vec![
            SqlValue::text(&self.username),
            SqlValue::Int(self.prs_opened),
            SqlValue::Int(self.prs_merged),
            SqlValue::Int(self.prs_closed),
            SqlValue::Int(self.issues_opened),
            SqlValue::Int(self.issues_closed),
            SqlValue::Int(self.commits_total),
            SqlValue::Int(self.reviews_given),
            SqlValue::Int(self.repositories_contributed_to),
            SqlValue::day(self.snapshot_date),
            SqlValue::timestamp(Some(now)),
        ]
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            username: row.try_get("username")?,
            prs_opened: row.try_get("prs_opened")?,
            prs_merged: row.try_get("prs_merged")?,
            prs_closed: row.try_get("prs_closed")?,
            issues_opened: row.try_get("issues_opened")?,
            issues_closed: row.try_get("issues_closed")?,
            commits_total: row.try_get("commits_total")?,
            reviews_given: row.try_get("reviews_given")?,
            repositories_contributed_to: row.try_get("repositories_contributed_to")?,
            snapshot_date: parse_day(&row.try_get::<String, _>("snapshot_date")?)?,
        })
    }
}

/// Statistics of one repository on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Owner login
    pub owner: String,
    /// Repository name
    pub name: String,
    /// `owner/name`
    pub full_name: String,
    /// Stargazer count
    pub stars: i64,
    /// Fork count
    pub forks: i64,
    /// Watcher count
    pub watchers: i64,
    /// Open issue count
    pub open_issues: i64,
    /// Primary language, `Unknown` when not detected
    pub language: String,
    /// Repository description
    pub description: Option<String>,
    /// Homepage URL
    pub homepage: Option<String>,
    /// Topic tags
    pub topics: Vec<String>,
    /// Whether the repository is a fork
    pub is_fork: bool,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last metadata update
    pub updated_at: Option<DateTime<Utc>>,
    /// Last push
    pub pushed_at: Option<DateTime<Utc>>,
    /// Day the snapshot covers
    pub snapshot_date: NaiveDate,
}

impl RepositorySnapshot {
    pub(crate) fn values(&self, now: DateTime<Utc>) -> Result<Vec<SqlValue>> {
        let topics = serde_json::to_string(&self.topics)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        Ok(vec![
            SqlValue::text(&self.owner),
            SqlValue::text(&self.name),
            SqlValue::text(&self.full_name),
            SqlValue::Int(self.stars),
            SqlValue::Int(self.forks),
            SqlValue::Int(self.watchers),
            SqlValue::Int(self.open_issues),
            SqlValue::text(&self.language),
            SqlValue::opt_text(self.description.as_deref()),
            SqlValue::opt_text(self.homepage.as_deref()),
            SqlValue::text(topics),
            SqlValue::Int(i64::from(self.is_fork)),
            SqlValue::timestamp(self.created_at),
            SqlValue::timestamp(self.updated_at),
            SqlValue::timestamp(self.pushed_at),
            SqlValue::day(self.snapshot_date),
            SqlValue::timestamp(Some(now)),
        ])
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        let topics: String = row.try_get("topics")?;
        let topics = serde_json::from_str(&topics)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        Ok(Self {
            owner: row.try_get("owner")?,
            name: row.try_get("name")?,
            full_name: row.try_get("full_name")?,
            stars: row.try_get("stars")?,
            forks: row.try_get("forks")?,
            watchers: row.try_get("watchers")?,
            open_issues: row.try_get("open_issues")?,
            language: row.try_get("language")?,
            description: row.try_get("description")?,
            homepage: row.try_get("homepage")?,
            topics,
            is_fork: row.try_get::<i64, _>("is_fork")? != 0,
            created_at: parse_timestamp(row.try_get("created_at")?)?,
            updated_at: parse_timestamp(row.try_get("updated_at")?)?,
            pushed_at: parse_timestamp(row.try_get("pushed_at")?)?,
            snapshot_date: parse_day(&row.try_get::<String, _>("snapshot_date")?)?,
        })
    }
}

/// Package index statistics on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSnapshot {
    /// Package name
    pub package_name: String,
    /// Latest released version
    pub version: Option<String>,
    /// Downloads over the last day
    pub downloads_last_day: i64,
    /// Downloads over the last week
    pub downloads_last_week: i64,
    /// Downloads over the last month
    pub downloads_last_month: i64,
    /// Number of published releases
    pub total_releases: i64,
    /// Upload time of the earliest release
    pub first_release_date: Option<DateTime<Utc>>,
    /// Upload time of the latest release
    pub latest_release_date: Option<DateTime<Utc>>,
    /// Supported interpreter range
    pub requires_python: Option<String>,
    /// Package author
    pub author: Option<String>,
    /// One-line summary
    pub summary: Option<String>,
    /// Day the snapshot covers
    pub snapshot_date: NaiveDate,
}

impl PackageSnapshot {
    pub(crate) fn values(&self, now: DateTime<Utc>) -> Vec<SqlValue> {
        vec![
            SqlValue::text(&self.package_name),
            SqlValue::opt_text(self.version.as_deref()),
            SqlValue::Int(self.downloads_last_day),
            SqlValue::Int(self.downloads_last_week),
            SqlValue::Int(self.downloads_last_month),
            SqlValue::Int(self.total_releases),
            SqlValue::timestamp(self.first_release_date),
            SqlValue::timestamp(self.latest_release_date),
            SqlValue::opt_text(self.requires_python.as_deref()),
            SqlValue::opt_text(self.author.as_deref()),
            SqlValue::opt_text(self.summary.as_deref()),
            SqlValue::day(self.snapshot_date),
            SqlValue::timestamp(Some(now)),
        ]
    }

    pub(crate) fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            package_name: row.try_get("package_name")?,
            version: row.try_get("version")?,
            downloads_last_day: row.try_get("downloads_last_day")?,
            downloads_last_week: row.try_get("downloads_last_week")?,
            downloads_last_month: row.try_get("downloads_last_month")?,
            total_releases: row.try_get("total_releases")?,
            first_release_date: parse_timestamp(row.try_get("first_release_date")?)?,
            latest_release_date: parse_timestamp(row.try_get("latest_release_date")?)?,
            requires_python: row.try_get("requires_python")?,
            author: row.try_get("author")?,
            summary: row.try_get("summary")?,
            snapshot_date: parse_day(&row.try_get::<String, _>("snapshot_date")?)?,
        })
    }
}
