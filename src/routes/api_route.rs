use std::{path::Path, time::Duration};

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    configuration::Settings,
    dal::{scrape_result_db, stat_db},
    domain::{ExtractionMode, TargetUrl},
    services::{export_and_store, purge_older_than, AnalysisError, Analyzer, ArtifactWriter},
};

use super::{validate_target, ApiError};

#[get("/status/{id}")]
pub async fn status(
    path: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let result = scrape_result_db::get_scrape_result(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("result {} not found", id)))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "id": result.id,
        "url": result.url,
        "analysis_type": result.analysis_type,
        "status": result.status,
        "title": result.title,
        "error": result.error_message,
        "created_at": result.created_at,
        "completed_at": result.completed_at,
    })))
}

#[derive(Deserialize, Debug)]
pub struct ValidateRequest {
    pub url: String,
}

#[post("/v1/validate/url")]
pub async fn validate_url(
    body: web::Json<ValidateRequest>,
    settings: web::Data<Settings>,
) -> HttpResponse {
    match validate_target(&body.url, None, &settings) {
        Ok((url, _)) => HttpResponse::Ok().json(json!({
            "valid": true,
            "normalized_url": url.as_str(),
        })),
        Err(e) => HttpResponse::Ok().json(json!({
            "valid": false,
            "error": e.to_string(),
        })),
    }
}

#[derive(Deserialize, Debug)]
pub struct ExtractRequest {
    pub url: String,
    #[serde(default)]
    pub analysis_type: Option<String>,
}

/// Runs the whole pipeline inside the request and keeps the artifact folders.
#[post("/unified-extract")]
pub async fn unified_extract(
    body: web::Json<ExtractRequest>,
    pool: web::Data<SqlitePool>,
    analyzer: web::Data<Analyzer>,
    writer: web::Data<ArtifactWriter>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let (url, mode) = validate_target(&body.url, body.analysis_type.as_deref(), &settings)?;
    let created_at = Utc::now();

    let outcome = match analyzer
        .analyze_with_timeout(&url, mode, settings.worker.job_timeout())
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return failed_extraction(&pool, &url, mode, created_at, e).await,
    };

    let dir = match writer.write(analyzer.fetcher(), &outcome).await {
        Ok(dir) => dir.to_string_lossy().into_owned(),
        Err(e) => {
            return failed_extraction(&pool, &url, mode, created_at, AnalysisError::Artifact(e))
                .await
        }
    };

    let id =
        scrape_result_db::insert_completed(&pool, &outcome.report, Some(&dir), created_at).await?;
    if let Some(row) = scrape_result_db::get_scrape_result(&pool, id).await? {
        if let Err(e) = export_and_store(&row).await {
            log::warn!("Failed to store export for result {}: {}", id, e);
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "id": id,
        "output_dir": dir,
        "result": outcome.report,
    })))
}

async fn failed_extraction(
    pool: &SqlitePool,
    url: &TargetUrl,
    mode: ExtractionMode,
    created_at: DateTime<Utc>,
    error: AnalysisError,
) -> Result<HttpResponse, ApiError> {
    log::warn!("Unified extraction of {} failed: {}", url, error);
    let message = error.to_string();
    let id = scrape_result_db::insert_failed(pool, url.as_str(), mode, &message, created_at).await?;

    Ok(HttpResponse::BadGateway().json(json!({
        "success": false,
        "id": id,
        "error": message,
    })))
}

#[derive(Deserialize, Debug)]
pub struct CleanupRequest {
    pub max_age_hours: Option<u64>,
}

#[post("/cache/cleanup")]
pub async fn cache_cleanup(
    body: Option<web::Json<CleanupRequest>>,
    pool: web::Data<SqlitePool>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let max_age = body
        .and_then(|b| b.max_age_hours)
        .map(|hours| Duration::from_secs(hours.saturating_mul(60 * 60)))
        .unwrap_or_else(|| settings.cache.max_age());

    let report = purge_older_than(&pool, Path::new(&settings.storage.output_dir), max_age).await?;
    log::info!(
        "Manual cleanup removed {} rows and {} folders",
        report.rows_deleted,
        report.dirs_deleted
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "rows_deleted": report.rows_deleted,
        "dirs_deleted": report.dirs_deleted,
    })))
}

#[get("/stats")]
pub async fn stats(pool: web::Data<SqlitePool>) -> Result<HttpResponse, ApiError> {
    let total = scrape_result_db::count_scrape_results(&pool).await?;
    let by_status = stat_db::get_status_stats(&pool).await?;
    let by_mode = stat_db::get_mode_stats(&pool).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total": total,
        "by_status": by_status,
        "by_mode": by_mode,
    })))
}
