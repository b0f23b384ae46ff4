use actix_web::{post, web, Either, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    configuration::Settings,
    dal::scrape_result_db,
    domain::{ExtractionMode, TargetUrl},
    services::{lookup_cached, AnalysisJob, AnalysisQueue, SubmitError},
};

use super::ApiError;

#[derive(Deserialize, Debug)]
pub struct AnalyzeRequest {
    pub url: String,
    #[serde(default)]
    pub analysis_type: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

/// Parses the URL and mode and applies the private-host guard.
pub fn validate_target(
    url: &str,
    analysis_type: Option<&str>,
    settings: &Settings,
) -> Result<(TargetUrl, ExtractionMode), ApiError> {
    let target = TargetUrl::parse(url).map_err(ApiError::Validation)?;
    if !settings.scraper.allow_private_hosts {
        target.ensure_public_host().map_err(ApiError::Validation)?;
    }

    let mode = match analysis_type.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mode) => mode.parse().map_err(ApiError::Validation)?,
        None => ExtractionMode::default(),
    };

    Ok((target, mode))
}

#[post("/analyze")]
pub async fn analyze(
    body: Either<web::Json<AnalyzeRequest>, web::Form<AnalyzeRequest>>,
    pool: web::Data<SqlitePool>,
    queue: web::Data<AnalysisQueue>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, ApiError> {
    let body = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let (url, mode) = validate_target(&body.url, body.analysis_type.as_deref(), &settings)?;

    if body.use_cache {
        if let Some(hit) = lookup_cached(&pool, &settings.cache, &url, mode).await? {
            return Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "id": hit.id,
                "status": hit.status,
                "cached": true,
            })));
        }
    }

    let id = scrape_result_db::insert_pending(&pool, url.as_str(), mode, Utc::now()).await?;

    match queue.submit(AnalysisJob { id, url, mode }) {
        Ok(()) => Ok(HttpResponse::Accepted().json(json!({
            "success": true,
            "id": id,
            "status": "pending",
            "cached": false,
        }))),
        Err(e) => {
            log::warn!("Rejecting analysis {}: {}", id, e);
            scrape_result_db::mark_failed(&pool, id, &e.to_string()).await?;
            match e {
                SubmitError::Full => Err(ApiError::QueueFull),
                SubmitError::Closed => Err(ApiError::Unexpected(e.into())),
            }
        }
    }
}
