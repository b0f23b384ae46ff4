mod helpers;

use std::collections::BTreeSet;

use chrono::Utc;
use helpers::{fixture_page, spawn_app};
use serde_json::{json, Value};
use siteprobe::{dal::scrape_result_db, domain::ExtractionMode};
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

async fn completed_result(app: &helpers::TestApp) -> i64 {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(fixture_page("Exported page"), "text/html"),
        )
        .mount(&server)
        .await;

    let body: Value = app
        .post_analyze(&json!({ "url": server.uri(), "analysis_type": "ultra" }))
        .await
        .json()
        .await
        .unwrap();
    let id = body["id"].as_i64().unwrap();
    let status = app.wait_for_terminal(id).await;
    assert_eq!(status["status"], "completed", "{}", status);
    id
}

#[tokio::test]
async fn unknown_results_are_404() {
    let app = spawn_app().await;

    for path in ["/results/999", "/results/999/export", "/api/status/999"] {
        let response = app.get(path).await;
        assert_eq!(response.status().as_u16(), 404, "{}", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn export_returns_an_attachment_with_the_expected_keys() {
    let app = spawn_app().await;
    let id = completed_result(&app).await;

    let response = app.get(&format!("/results/{}/export", id)).await;
    assert_eq!(response.status().as_u16(), 200);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&format!("siteprobe_result_{}.json", id)));

    let text = response.text().await.unwrap();
    let export: Value = serde_json::from_str(&text).unwrap();
    let keys: BTreeSet<&str> = export.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        BTreeSet::from([
            "analysis_type",
            "completed_at",
            "created_at",
            "id",
            "result",
            "status",
            "title",
            "url"
        ])
    );
    assert_eq!(export["id"], id);
    assert_eq!(export["result"]["title"], "Exported page");
    assert!(export["result"]["security"]["score"].is_u64());
    assert!(export["result"]["assets"]["images"].is_array());
}

#[tokio::test]
async fn unfinished_results_cannot_be_exported() {
    let app = spawn_app().await;
    let id = scrape_result_db::insert_pending(
        &app.pool,
        "https://example.com/",
        ExtractionMode::Basic,
        Utc::now(),
    )
    .await
    .unwrap();

    let response = app.get(&format!("/results/{}/export", id)).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn results_are_listed_newest_first_with_filters() {
    let app = spawn_app().await;
    let now = Utc::now();
    for (i, url) in ["https://a.example/", "https://b.example/", "https://c.example/"]
        .iter()
        .enumerate()
    {
        scrape_result_db::insert_pending(
            &app.pool,
            url,
            ExtractionMode::Basic,
            now + chrono::Duration::seconds(i as i64),
        )
        .await
        .unwrap();
    }
    scrape_result_db::insert_failed(
        &app.pool,
        "https://d.example/",
        ExtractionMode::Secure,
        "boom",
        now,
    )
    .await
    .unwrap();

    let all: Value = app.get("/results").await.json().await.unwrap();
    assert_eq!(all["count"], 4);
    assert_eq!(all["results"][0]["url"], "https://c.example/");

    let limited: Value = app.get("/results?limit=2").await.json().await.unwrap();
    assert_eq!(limited["count"], 2);

    let failed: Value = app.get("/results?status=failed").await.json().await.unwrap();
    assert_eq!(failed["count"], 1);
    assert_eq!(failed["results"][0]["error_message"], "boom");
    assert_eq!(failed["results"][0]["analysis_type"], "secure");

    let response = app.get("/results?status=exploded").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn status_endpoint_reports_row_fields() {
    let app = spawn_app().await;
    let id = scrape_result_db::insert_failed(
        &app.pool,
        "https://example.com/",
        ExtractionMode::Advanced,
        "upstream exploded",
        Utc::now(),
    )
    .await
    .unwrap();

    let status: Value = app
        .get(&format!("/api/status/{}", id))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(status["success"], true);
    assert_eq!(status["id"], id);
    assert_eq!(status["url"], "https://example.com/");
    assert_eq!(status["analysis_type"], "advanced");
    assert_eq!(status["status"], "failed");
    assert_eq!(status["error"], "upstream exploded");
    assert!(status["title"].is_null());
    assert!(status["created_at"].is_string());
}
