// Shared helpers for the HTTP integration tests.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde_json::Value;
use siteprobe::{
    configuration::{get_configuration, Settings},
    startup::{get_connection_pool, Application},
};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub output_dir: PathBuf,
    pub client: reqwest::Client,
    _workspace: TempDir,
}

#[allow(dead_code)]
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Starts the application on a random port with a throwaway database and
/// output directory. Private hosts are allowed so wiremock can be targeted.
pub async fn spawn_app_with(customize: impl FnOnce(&mut Settings)) -> TestApp {
    let _ = env_logger::builder().is_test(true).try_init();

    let workspace = tempfile::tempdir().expect("Failed to create temp dir");
    let output_dir = workspace.path().join("extractions");

    let mut settings = get_configuration().expect("Failed to read configuration");
    settings.application.host = "127.0.0.1".to_string();
    settings.application.port = 0;
    settings.database.url = format!("sqlite://{}", workspace.path().join("test.db").display());
    settings.scraper.allow_private_hosts = true;
    settings.scraper.retries = 0;
    settings.scraper.timeout_secs = 5;
    settings.cache.cleanup_interval_secs = 0;
    settings.storage.output_dir = output_dir.to_string_lossy().into_owned();
    customize(&mut settings);

    let pool = get_connection_pool(&settings.database).expect("Failed to build pool");
    let application = Application::build(settings)
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", application.port());
    tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        pool,
        output_dir,
        client: reqwest::Client::new(),
        _workspace: workspace,
    }
}

#[allow(dead_code)]
impl TestApp {
    pub async fn post_analyze(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/analyze", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Polls the status endpoint until the row is completed or failed.
    pub async fn wait_for_terminal(&self, id: i64) -> Value {
        for _ in 0..100 {
            let status: Value = self
                .get(&format!("/api/status/{}", id))
                .await
                .json()
                .await
                .expect("Status response was not JSON");
            if status["status"] == "completed" || status["status"] == "failed" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Result {} never reached a terminal state", id);
    }

    pub async fn row_count(&self) -> i64 {
        sqlx::query_scalar("select count(*) from scrape_result")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count rows")
    }
}

#[allow(dead_code)]
pub fn fixture_page(title: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <title>{}</title>
  <meta name="description" content="Fixture page used by the siteprobe integration tests.">
  <link rel="stylesheet" href="/style.css">
</head>
<body>
  <h1>Fixture</h1>
  <p>Some words on a page.</p>
  <a href="/about">About</a>
  <a href="https://www.rust-lang.org/">Rust</a>
  <img src="/logo.png" alt="Logo">
</body>
</html>"#,
        title
    )
}

#[allow(dead_code)]
pub fn folder_name(output_dir: &str) -> String {
    Path::new(output_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .expect("Output dir has no folder name")
}
