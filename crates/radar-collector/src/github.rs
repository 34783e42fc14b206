//! GitHub REST payloads and their conversion into stored records.
//!
//! Only the fields Radar reads are modelled. Missing counts decode as zero and
//! missing text as `None`, so a sparse payload still produces a record.

use chrono::{DateTime, NaiveDate, Utc};
use radar_core::{Issue, RepoCategory};
use radar_db::{ProfileSnapshot, RepositorySnapshot};
use serde::Deserialize;

/// Longest issue body kept, in characters.
pub const MAX_BODY_CHARS: usize = 500;

/// `GET /users/{username}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub login: String,
    pub public_repos: i64,
    pub followers: i64,
    pub following: i64,
    pub public_gists: i64,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub hireable: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Profile snapshot for `day` with repository totals filled in.
    #[must_use]
    pub fn into_snapshot(self, username: &str, totals: RepoTotals, day: NaiveDate) -> ProfileSnapshot {
        ProfileSnapshot {
            username: username.to_string(),
            public_repos: self.public_repos,
            total_stars: totals.stars,
            total_forks: totals.forks,
            followers: self.followers,
            following: self.following,
            public_gists: self.public_gists,
            bio: non_empty(self.bio),
            company: non_empty(self.company),
            location: non_empty(self.location),
            hireable: self.hireable.unwrap_or(false),
            created_at: self.created_at,
            updated_at: self.updated_at,
            snapshot_date: day,
        }
    }
}

/// Owner object embedded in repository payloads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub login: String,
}

/// One element of `GET /users/{username}/repos`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub fork: bool,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub watchers_count: i64,
    pub open_issues_count: i64,
    pub language: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub topics: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Repository snapshot for `day`.
    #[must_use]
    pub fn into_snapshot(self, day: NaiveDate) -> RepositorySnapshot {
        RepositorySnapshot {
            owner: self.owner.login,
            name: self.name,
            full_name: self.full_name,
            stars: self.stargazers_count,
            forks: self.forks_count,
            watchers: self.watchers_count,
            open_issues: self.open_issues_count,
            language: non_empty(self.language).unwrap_or_else(|| "Unknown".to_string()),
            description: non_empty(self.description),
            homepage: non_empty(self.homepage),
            topics: self.topics,
            is_fork: self.fork,
            created_at: self.created_at,
            updated_at: self.updated_at,
            pushed_at: self.pushed_at,
            snapshot_date: day,
        }
    }
}

/// Stars and forks summed over an account's own (non-fork) repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoTotals {
    /// Sum of stargazers
    pub stars: i64,
    /// Sum of forks
    pub forks: i64,
}

impl RepoTotals {
    /// Add one repository unless it is a fork.
    pub fn add(&mut self, repo: &Repository) {
        if !repo.fork {
            self.stars += repo.stargazers_count;
            self.forks += repo.forks_count;
        }
    }
}

/// Label object on issues.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Label {
    pub name: String,
}

/// One element of the issue list or issue search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    pub number: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<Owner>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    /// Present only when the item is a pull request
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssueItem {
    /// Whether the item is a pull request rather than an issue.
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Unscored issue belonging to `repository`.
    #[must_use]
    pub fn into_issue(self, repository: &str, category: RepoCategory) -> Issue {
        let body: String = self
            .body
            .unwrap_or_default()
            .chars()
            .take(MAX_BODY_CHARS)
            .collect();

        Issue {
            repository: repository.to_string(),
            number: self.number,
            title: self.title,
            url: self.html_url,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            comments: self.comments,
            state: if self.state.is_empty() {
                "open".to_string()
            } else {
                self.state
            },
            author: self
                .user
                .map(|u| u.login)
                .filter(|login| !login.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
            body,
            score: 0.0,
            category,
        }
    }
}

/// `GET /search/issues` envelope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResults {
    pub total_count: i64,
    pub items: Vec<IssueItem>,
}

/// Commit entry inside a push event payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PushCommit {
    pub sha: String,
}

/// Payload of a public event; only push events carry commits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventPayload {
    pub commits: Vec<PushCommit>,
}

/// One element of `GET /users/{username}/events/public`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

/// Commits pushed at or after `cutoff`.
#[must_use]
pub fn count_push_commits(events: &[Event], cutoff: DateTime<Utc>) -> i64 {
    events
        .iter()
        .filter(|e| e.kind == "PushEvent" && e.created_at >= cutoff)
        .map(|e| i64::try_from(e.payload.commits.len()).unwrap_or(i64::MAX))
        .sum()
}

/// `owner/name` taken from an API repository URL.
#[must_use]
pub fn repo_from_api_url(url: &str) -> Option<String> {
    let mut parts = url.trim_end_matches('/').rsplit('/');
    let name = parts.next().filter(|s| !s.is_empty())?;
    let owner = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{owner}/{name}"))
}

/// One element of `GET /repos/{repo}/contents/{path}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub download_url: Option<String>,
}

impl ContentEntry {
    /// Regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }

    /// Directory that is not hidden.
    #[must_use]
    pub fn is_visible_dir(&self) -> bool {
        self.kind == "dir" && !self.name.starts_with('.')
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
