use actix_web::{
    get,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web, HttpResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{dal::scrape_result_db, domain::ScrapeStatus, services::export_and_store};

use super::ApiError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Deserialize, Debug)]
pub struct ResultsQuery {
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[get("/results")]
pub async fn list_results(
    query: web::Query<ResultsQuery>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<ScrapeStatus>)
        .transpose()
        .map_err(ApiError::Validation)?;

    let results = scrape_result_db::list_scrape_results(&pool, status, limit).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": results.len(),
        "results": results,
    })))
}

#[get("/results/{id}")]
pub async fn get_result(
    path: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let result = scrape_result_db::get_scrape_result(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("result {} not found", id)))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "result": result,
    })))
}

#[get("/results/{id}/export")]
pub async fn export_result(
    path: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let result = scrape_result_db::get_scrape_result(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("result {} not found", id)))?;

    let export = export_and_store(&result).await?;

    Ok(HttpResponse::Ok()
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(format!(
                "siteprobe_result_{}.json",
                id
            ))],
        })
        .json(export))
}
