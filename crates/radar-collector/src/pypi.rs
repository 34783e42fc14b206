//! PyPI JSON API and pypistats payloads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use radar_db::PackageSnapshot;
use serde::Deserialize;
use std::collections::HashMap;

/// `info` object of `GET /pypi/{package}/json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageInfo {
    pub version: Option<String>,
    pub requires_python: Option<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
}

/// One uploaded file of a release.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseFile {
    pub upload_time: Option<String>,
    pub upload_time_iso_8601: Option<DateTime<Utc>>,
}

impl ReleaseFile {
    /// Upload time, preferring the zoned field. The legacy field is UTC
    /// without an offset.
    #[must_use]
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.upload_time_iso_8601.or_else(|| {
            self.upload_time
                .as_deref()
                .and_then(|s| s.parse::<NaiveDateTime>().ok())
                .map(|naive| naive.and_utc())
        })
    }
}

/// `GET /pypi/{package}/json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageDocument {
    pub info: PackageInfo,
    pub releases: HashMap<String, Vec<ReleaseFile>>,
}

impl PackageDocument {
    /// Upload time of the first file of every non-empty release, ascending.
    #[must_use]
    pub fn release_dates(&self) -> Vec<DateTime<Utc>> {
        let mut dates: Vec<DateTime<Utc>> = self
            .releases
            .values()
            .filter_map(|files| files.first())
            .filter_map(ReleaseFile::uploaded_at)
            .collect();
        dates.sort();
        dates
    }
}

/// `data` object of `GET /api/packages/{package}/recent`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RecentDownloads {
    pub last_day: i64,
    pub last_week: i64,
    pub last_month: i64,
}

/// `GET /api/packages/{package}/recent`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RecentDownloadsDocument {
    pub data: RecentDownloads,
}

/// Package snapshot for `day`.
#[must_use]
pub fn package_snapshot(
    name: &str,
    document: PackageDocument,
    downloads: RecentDownloads,
    day: NaiveDate,
) -> PackageSnapshot {
    let dates = document.release_dates();
    PackageSnapshot {
        package_name: name.to_string(),
        version: document.info.version.filter(|s| !s.is_empty()),
        downloads_last_day: downloads.last_day,
        downloads_last_week: downloads.last_week,
        downloads_last_month: downloads.last_month,
        total_releases: i64::try_from(document.releases.len()).unwrap_or(i64::MAX),
        first_release_date: dates.first().copied(),
        latest_release_date: dates.last().copied(),
        requires_python: document.info.requires_python.filter(|s| !s.is_empty()),
        author: document.info.author.filter(|s| !s.is_empty()),
        summary: document.info.summary.filter(|s| !s.is_empty()),
        snapshot_date: day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_package_snapshot() {
        let document: PackageDocument = serde_json::from_value(json!({
            "info": {"version": "1.2.0", "requires_python": ">=3.9", "author": "", "summary": "Tools"},
            "releases": {
                "1.0.0": [{"upload_time": "2023-01-05T10:00:00"}],
                "1.1.0": [],
                "1.2.0": [{"upload_time_iso_8601": "2024-02-01T08:30:00Z",
                           "upload_time": "2024-02-01T08:30:00"}]
            }
        }))
        .expect("decode package");

        let downloads = RecentDownloads {
            last_day: 5,
            last_week: 40,
            last_month: 150,
        };
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date");
        let snapshot = package_snapshot("radar-tools", document, downloads, day);

        assert_eq!(snapshot.version.as_deref(), Some("1.2.0"));
        assert_eq!(snapshot.total_releases, 3);
        assert_eq!(snapshot.author, None);
        assert_eq!(
            snapshot.first_release_date,
            Some(Utc.with_ymd_and_hms(2023, 1, 5, 10, 0, 0).unwrap())
        );
        assert_eq!(
            snapshot.latest_release_date,
            Some(Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(snapshot.downloads_last_month, 150);
    }

    #[test]
    fn test_missing_download_data_is_zero() {
        let doc: RecentDownloadsDocument =
            serde_json::from_value(json!({"type": "recent_downloads"})).expect("decode");
        assert_eq!(doc.data.last_week, 0);
    }
}
