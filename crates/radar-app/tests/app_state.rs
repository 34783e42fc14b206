use async_trait::async_trait;
use radar_app::AppState;
use radar_collector::Fetchers;
use radar_core::{AppConfig, RepoCategory};
use radar_db::Database;
use radar_fetch::{FetchPolicy, HttpClient, HttpResponse, RateLimiter};
use radar_scheduler::{JobRunner, JobType};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers every request with 404 and counts them.
#[derive(Default)]
struct NotFoundClient {
    requests: AtomicUsize,
}

#[async_trait]
impl HttpClient for NotFoundClient {
    async fn get(&self, _path: &str, _params: &[(String, String)]) -> radar_fetch::Result<HttpResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::json_body(404, &json!({"message": "Not Found"})))
    }

    async fn post(&self, path: &str, _body: &Value) -> radar_fetch::Result<HttpResponse> {
        self.get(path, &[]).await
    }
}

async fn state_with(config: AppConfig, client: Arc<NotFoundClient>) -> AppState {
    let db = Database::new(":memory:")
        .await
        .expect("create test database");
    db.run_migrations().await.expect("run migrations");

    let fetchers = Fetchers::new(
        client.clone(),
        client.clone(),
        client,
        Arc::new(RateLimiter::new()),
        &FetchPolicy::default(),
    );
    AppState::with_fetchers(config, db, fetchers)
}

#[tokio::test]
async fn test_default_config_only_schedules_issue_radar() {
    let state = state_with(AppConfig::default(), Arc::new(NotFoundClient::default())).await;
    let jobs = state.scheduled_jobs();

    let enabled: Vec<JobType> = jobs.iter().filter(|j| j.enabled).map(|j| j.job_type).collect();
    assert_eq!(enabled, vec![JobType::IssueRadar]);
    assert_eq!(jobs.len(), 3);
}

#[tokio::test]
async fn test_configured_targets_enable_jobs() {
    let mut config = AppConfig::default();
    config.pypi.packages = vec!["radar-tools".to_string()];
    config.vuln_scan.repos = vec!["acme/app".to_string()];

    let state = state_with(config, Arc::new(NotFoundClient::default())).await;

    assert!(state.scheduled_jobs().iter().all(|j| j.enabled));
}

#[tokio::test]
async fn test_issue_radar_job_logs_every_repository() {
    let mut config = AppConfig::default();
    config.radar.categories = vec![RepoCategory::Compliance];
    let client = Arc::new(NotFoundClient::default());

    let state = state_with(config, client.clone()).await;
    state.run(JobType::IssueRadar).await;

    let scans = state.db.store().recent_scans(50).await.expect("scan log");
    assert_eq!(scans.len(), 15);
    assert!(scans.iter().all(|s| s.status == "failed"));
    assert_eq!(client.requests.load(Ordering::SeqCst), 15);
}

#[tokio::test]
async fn test_metrics_job_logs_missing_package() {
    let mut config = AppConfig::default();
    config.pypi.packages = vec!["missing-tools".to_string()];

    let state = state_with(config, Arc::new(NotFoundClient::default())).await;
    state.run(JobType::CollectMetrics).await;

    let log = state.db.store().recent_collections(10).await.expect("collection log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].target, "missing-tools");
    assert_eq!(log[0].status, "failed");
    assert!(log[0].run_id.is_some());
}

#[tokio::test]
async fn test_open_creates_and_migrates_database_file() {
    let tmp = tempfile::TempDir::new().expect("create temp dir");
    let path = tmp.path().join("data").join("radar.db");
    let mut config = AppConfig::default();
    config.general.database_path = Some(path.clone());

    let state = AppState::open(config).await.expect("open app state");

    assert!(path.exists());
    assert!(state.db.get_schema_version().await.expect("schema version") > 0);
    assert!(state.db.store().recent_scans(1).await.expect("scan log").is_empty());
}
