use chrono::{Duration, NaiveDate, TimeZone, Utc};
use radar_core::{Confidence, Finding, FindingType, Issue, MetricType, RepoCategory, Severity};
use radar_db::{
    audit_log, findings, issues, ContributionSnapshot, Database, DatabaseError, ProfileSnapshot,
    RecordKind, RepositorySnapshot, SaveOutcome, SnapshotQuery, SnapshotStore, StoredRecord,
};

async fn setup_store() -> (Database, SnapshotStore) {
    let db = Database::new(":memory:")
        .await
        .expect("create test database");
    db.run_migrations().await.expect("run migrations");
    let store = db.store();
    (db, store)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
}

fn profile(username: &str, followers: i64, snapshot_date: NaiveDate) -> ProfileSnapshot {
    ProfileSnapshot {
        username: username.to_string(),
        public_repos: 12,
        total_stars: 340,
        total_forks: 21,
        followers,
        following: 5,
        public_gists: 2,
        bio: Some("builds things".to_string()),
        company: None,
        location: Some("Berlin".to_string()),
        hireable: true,
        created_at: Some(Utc.with_ymd_and_hms(2015, 6, 1, 8, 0, 0).unwrap()),
        updated_at: None,
        snapshot_date,
    }
}

fn repository(full_name: &str, stars: i64, snapshot_date: NaiveDate) -> RepositorySnapshot {
    let (owner, name) = full_name.split_once('/').expect("owner/name");
    RepositorySnapshot {
        owner: owner.to_string(),
        name: name.to_string(),
        full_name: full_name.to_string(),
        stars,
        forks: 3,
        watchers: stars,
        open_issues: 1,
        language: "Unknown".to_string(),
        description: None,
        homepage: None,
        topics: vec!["security".to_string(), "cli".to_string()],
        is_fork: false,
        created_at: None,
        updated_at: None,
        pushed_at: Some(Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()),
        snapshot_date,
    }
}

fn issue(number: i64, score: f64) -> Issue {
    Issue {
        repository: "pallets/flask".to_string(),
        number,
        title: format!("Issue {number}"),
        url: format!("https://github.com/pallets/flask/issues/{number}"),
        labels: vec!["good first issue".to_string()],
        created_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        comments: 2,
        state: "open".to_string(),
        author: "octocat".to_string(),
        body: "Steps to reproduce".to_string(),
        score,
        category: RepoCategory::AiMl,
    }
}

fn finding(line_number: u32, severity: Severity, evidence: &str) -> Finding {
    Finding {
        repository: "acme/app".to_string(),
        file_path: "app/db.py".to_string(),
        line_number,
        finding_type: FindingType::SqlInjection,
        severity,
        title: "Potential SQL Injection".to_string(),
        description: "Pattern matched: execute".to_string(),
        cwe_id: Some("CWE-89".to_string()),
        evidence: evidence.to_string(),
        confidence: Confidence::Medium,
    }
}

#[tokio::test]
async fn test_replace_table_keeps_one_row_with_latest_values() {
    let (_db, store) = setup_store().await;

    let first = store
        .save(&profile("octocat", 100, day(1)).into())
        .await
        .expect("first save");
    let second = store
        .save(&profile("octocat", 150, day(1)).into())
        .await
        .expect("second save");

    assert_eq!(first, SaveOutcome::Inserted);
    assert_eq!(second, SaveOutcome::Replaced);

    let rows = store
        .query(&SnapshotQuery::new(RecordKind::Profile).key("octocat"))
        .await
        .expect("query profiles");
    assert_eq!(rows.len(), 1);
    match &rows[0] {
        StoredRecord::Profile(p) => {
            assert_eq!(p.followers, 150);
            assert!(p.hireable);
            assert_eq!(p.created_at, Some(Utc.with_ymd_and_hms(2015, 6, 1, 8, 0, 0).unwrap()));
        }
        other => panic!("unexpected record {other:?}"),
    }
}

#[tokio::test]
async fn test_snapshots_on_different_days_are_kept() {
    let (_db, store) = setup_store().await;

    let inserted = store
        .save_all(vec![
            profile("octocat", 100, day(1)).into(),
            profile("octocat", 110, day(2)).into(),
            profile("octocat", 120, day(3)).into(),
        ])
        .await
        .expect("save batch");
    assert_eq!(inserted, 3);

    let latest = store
        .latest(RecordKind::Profile, "octocat")
        .await
        .expect("latest")
        .expect("some snapshot");
    assert!(matches!(latest, StoredRecord::Profile(ref p) if p.followers == 120));
}

#[tokio::test]
async fn test_ignore_table_keeps_first_evidence() {
    let (_db, store) = setup_store().await;

    let first = store
        .save(&finding(10, Severity::Critical, "cursor.execute(\"SELECT \" + q)").into())
        .await
        .expect("first save");
    let second = store
        .save(&finding(10, Severity::Critical, "cursor.execute(\"UPDATE \" + q)").into())
        .await
        .expect("second save");

    assert_eq!(first, SaveOutcome::Inserted);
    assert_eq!(second, SaveOutcome::Ignored);

    let rows = store
        .query(&SnapshotQuery::new(RecordKind::Finding))
        .await
        .expect("query findings");
    assert_eq!(rows.len(), 1);
    assert!(matches!(
        &rows[0],
        StoredRecord::Finding(f) if f.evidence == "cursor.execute(\"SELECT \" + q)"
    ));

    let status: String = sqlx::query_scalar("SELECT status FROM findings")
        .fetch_one(store.pool())
        .await
        .expect("read status");
    assert_eq!(status, "new");
}

#[tokio::test]
async fn test_issue_rediscovery_updates_score_and_keeps_discovery_time() {
    let (_db, store) = setup_store().await;

    store.save(&issue(42, 45.0).into()).await.expect("first save");
    let discovered = issues::discovered_at(store.pool(), "pallets/flask", 42)
        .await
        .expect("read discovery")
        .expect("stored");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let mut updated = issue(42, 70.0);
    updated.category = RepoCategory::Security;
    let outcome = store.save(&updated.into()).await.expect("second save");
    assert_eq!(outcome, SaveOutcome::Replaced);

    let top = store.top_issues(10).await.expect("top issues");
    assert_eq!(top.len(), 1);
    assert!((top[0].score - 70.0).abs() < f64::EPSILON);
    assert_eq!(top[0].category, RepoCategory::Security);
    assert_eq!(top[0].labels, vec!["good first issue"]);

    let rediscovered = issues::discovered_at(store.pool(), "pallets/flask", 42)
        .await
        .expect("read discovery")
        .expect("stored");
    assert_eq!(discovered, rediscovered);
}

#[tokio::test]
async fn test_query_filters_prefix_range_order_and_limit() {
    let (_db, store) = setup_store().await;

    store
        .save_all(vec![
            repository("octocat/alpha", 5, day(1)).into(),
            repository("octocat/alpha", 8, day(2)).into(),
            repository("octocat/beta", 30, day(2)).into(),
            repository("octocat/gamma", 12, day(3)).into(),
            repository("other/alpha", 99, day(2)).into(),
            repository("octo_cat/delta", 1, day(2)).into(),
        ])
        .await
        .expect("save batch");

    let rows = store
        .query(
            &SnapshotQuery::new(RecordKind::Repository)
                .key_prefix("octocat/")
                .between(Some(day(2)), Some(day(3)))
                .order_by("stars", true)
                .limit(2),
        )
        .await
        .expect("query repositories");

    let names: Vec<(String, i64)> = rows
        .into_iter()
        .map(|r| match r {
            StoredRecord::Repository(r) => (r.full_name, r.stars),
            other => panic!("unexpected record {other:?}"),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("octocat/beta".to_string(), 30),
            ("octocat/gamma".to_string(), 12)
        ]
    );

    // Wildcards in the prefix are matched literally
    let literal = store
        .query(&SnapshotQuery::new(RecordKind::Repository).key_prefix("octo_"))
        .await
        .expect("query literal prefix");
    assert_eq!(literal.len(), 1);

    let topics = store
        .query(&SnapshotQuery::new(RecordKind::Repository).key("other/alpha"))
        .await
        .expect("query single repository");
    assert!(matches!(
        &topics[0],
        StoredRecord::Repository(r) if r.topics == vec!["security", "cli"]
    ));
}

#[tokio::test]
async fn test_query_rejects_unknown_order_column() {
    let (_db, store) = setup_store().await;

    let result = store
        .query(&SnapshotQuery::new(RecordKind::Profile).order_by("followers; DROP TABLE issues", false))
        .await;
    assert!(matches!(result, Err(DatabaseError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_contribution_snapshot_round_trip() {
    let (_db, store) = setup_store().await;

    let snapshot = ContributionSnapshot {
        username: "octocat".to_string(),
        prs_opened: 12,
        prs_merged: 9,
        prs_closed: 11,
        issues_opened: 4,
        issues_closed: 3,
        commits_total: 87,
        reviews_given: 6,
        repositories_contributed_to: 5,
        snapshot_date: day(4),
    };
    store.save(&snapshot.clone().into()).await.expect("save");

    let rows = store
        .query(&SnapshotQuery::new(RecordKind::Contribution).between(Some(day(4)), Some(day(4))))
        .await
        .expect("query");
    assert_eq!(rows, vec![StoredRecord::Contribution(snapshot)]);
}

#[tokio::test]
async fn test_findings_ordered_by_severity() {
    let (_db, store) = setup_store().await;

    let mut low = finding(3, Severity::Low, "random.random()");
    low.finding_type = FindingType::InsecureRandom;
    let mut high = finding(2, Severity::High, "pickle.loads(data)");
    high.finding_type = FindingType::InsecureDeserialization;
    let critical = finding(9, Severity::Critical, "os.system(cmd)");

    store
        .save_all(vec![low.into(), high.into(), critical.into()])
        .await
        .expect("save findings");

    let ordered = store.findings_by_severity(10).await.expect("findings");
    let severities: Vec<Severity> = ordered.iter().map(|f| f.severity).collect();
    assert_eq!(
        severities,
        vec![Severity::Critical, Severity::High, Severity::Low]
    );

    let counts = findings::counts_by_repository(store.pool())
        .await
        .expect("counts");
    assert_eq!(counts, vec![("acme/app".to_string(), 3)]);
}

#[tokio::test]
async fn test_audit_logs_are_append_only() {
    let (_db, store) = setup_store().await;

    store
        .log_scan("pallets/flask", 4, "success", None)
        .await
        .expect("log scan");
    store
        .log_scan("pallets/flask", 0, "failed", Some("HTTP 404"))
        .await
        .expect("log scan again");

    let scans = store.recent_scans(10).await.expect("recent scans");
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].status, "failed");
    assert_eq!(scans[0].error_message.as_deref(), Some("HTTP 404"));
    assert_eq!(scans[1].issues_found, 4);

    store
        .log_collection(Some("run-1"), MetricType::Profile, "octocat", "success", None)
        .await
        .expect("log collection");
    store
        .log_collection(Some("run-1"), MetricType::Pypi, "radar", "failed", Some("not found"))
        .await
        .expect("log collection");
    store
        .log_collection(Some("run-2"), MetricType::Profile, "octocat", "success", None)
        .await
        .expect("log collection");

    let run = audit_log::collections_for_run(store.pool(), "run-1")
        .await
        .expect("run entries");
    assert_eq!(run.len(), 2);
    assert_eq!(run[1].metric_type, "pypi");

    let recent = store.recent_collections(1).await.expect("recent");
    assert_eq!(recent[0].run_id.as_deref(), Some("run-2"));
    assert!(recent[0].collected_at > Utc::now() - Duration::minutes(1));
}
