use chrono::{DateTime, Utc};
use itertools::Itertools;
use sqlx::{sqlite::SqliteQueryResult, SqlitePool};

use crate::domain::{AnalysisReport, ExtractionMode, ScrapeResult, ScrapeStatus};

#[derive(sqlx::FromRow)]
struct ScrapeResultRow {
    id: i64,
    url: String,
    title: Option<String>,
    analysis_type: String,
    status: String,
    result_data: Option<String>,
    error_message: Option<String>,
    output_dir: Option<String>,
    created_at_ms: i64,
    completed_at_ms: Option<i64>,
}

impl TryFrom<ScrapeResultRow> for ScrapeResult {
    type Error = sqlx::Error;

    fn try_from(row: ScrapeResultRow) -> Result<Self, Self::Error> {
        let decode = |e: String| sqlx::Error::Decode(e.into());

        let result_data = match row.result_data {
            Some(json) => Some(
                serde_json::from_str::<AnalysisReport>(&json)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            ),
            None => None,
        };

        Ok(ScrapeResult {
            id: row.id,
            url: row.url,
            title: row.title,
            analysis_type: row.analysis_type.parse().map_err(decode)?,
            status: row.status.parse().map_err(decode)?,
            result_data,
            error_message: row.error_message,
            output_dir: row.output_dir,
            created_at: from_millis(row.created_at_ms)?,
            completed_at: row.completed_at_ms.map(from_millis).transpose()?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp {} out of range", ms).into()))
}

fn encode_report(report: &AnalysisReport) -> Result<String, sqlx::Error> {
    serde_json::to_string(report).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

const SELECT_COLUMNS: &str = r"
    select
        id, url, title, analysis_type, status, result_data,
        error_message, output_dir, created_at_ms, completed_at_ms
    from
        scrape_result
";

pub async fn insert_pending(
    pool: &SqlitePool,
    url: &str,
    mode: ExtractionMode,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r"
        insert into scrape_result
            (url, analysis_type, status, created_at_ms)
        values
            ($1, $2, 'pending', $3)
        returning id
        ",
    )
    .bind(url)
    .bind(mode.as_str())
    .bind(created_at.timestamp_millis())
    .fetch_one(pool)
    .await
}

/// Stores a finished synchronous extraction as one row.
pub async fn insert_completed(
    pool: &SqlitePool,
    report: &AnalysisReport,
    output_dir: Option<&str>,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let completed_at = Utc::now().max(created_at);

    sqlx::query_scalar(
        r"
        insert into scrape_result
            (url, title, analysis_type, status, result_data, output_dir, created_at_ms, completed_at_ms)
        values
            ($1, $2, $3, 'completed', $4, $5, $6, $7)
        returning id
        ",
    )
    .bind(&report.url)
    .bind(&report.title)
    .bind(report.analysis_type.as_str())
    .bind(encode_report(report)?)
    .bind(output_dir)
    .bind(created_at.timestamp_millis())
    .bind(completed_at.timestamp_millis())
    .fetch_one(pool)
    .await
}

pub async fn insert_failed(
    pool: &SqlitePool,
    url: &str,
    mode: ExtractionMode,
    error_message: &str,
    created_at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r"
        insert into scrape_result
            (url, analysis_type, status, error_message, created_at_ms, completed_at_ms)
        values
            ($1, $2, 'failed', $3, $4, $4)
        returning id
        ",
    )
    .bind(url)
    .bind(mode.as_str())
    .bind(error_message)
    .bind(created_at.timestamp_millis())
    .fetch_one(pool)
    .await
}

/// SQL list of the states `next` may be entered from.
fn allowed_sources(next: ScrapeStatus) -> String {
    ScrapeStatus::sources_of(next)
        .iter()
        .map(|status| format!("'{}'", status.as_str()))
        .join(", ")
}

/// Returns false when the row was not in a state that may move to processing.
pub async fn mark_processing(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let query = format!(
        r"
        update scrape_result set
            status = 'processing'
        where
            id = $1 and status in ({})
        ",
        allowed_sources(ScrapeStatus::Processing)
    );
    let result = sqlx::query(&query)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn mark_completed(
    pool: &SqlitePool,
    id: i64,
    report: &AnalysisReport,
    output_dir: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        r"
        update scrape_result set
            status = 'completed',
            title = $2,
            result_data = $3,
            output_dir = coalesce($4, output_dir),
            completed_at_ms = $5
        where
            id = $1 and status in ({})
        ",
        allowed_sources(ScrapeStatus::Completed)
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(&report.title)
        .bind(encode_report(report)?)
        .bind(output_dir)
        .bind(Utc::now().timestamp_millis())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn mark_failed(
    pool: &SqlitePool,
    id: i64,
    error_message: &str,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        r"
        update scrape_result set
            status = 'failed',
            error_message = $2,
            completed_at_ms = $3
        where
            id = $1 and status in ({})
        ",
        allowed_sources(ScrapeStatus::Failed)
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(error_message)
        .bind(Utc::now().timestamp_millis())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_scrape_result(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ScrapeResult>, sqlx::Error> {
    let query = format!("{} where id = $1", SELECT_COLUMNS);

    sqlx::query_as::<_, ScrapeResultRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(ScrapeResult::try_from)
        .transpose()
}

pub async fn list_scrape_results(
    pool: &SqlitePool,
    status: Option<ScrapeStatus>,
    limit: i64,
) -> Result<Vec<ScrapeResult>, sqlx::Error> {
    let query = format!(
        "{} where ($1 is null or status = $1) order by created_at_ms desc, id desc limit $2",
        SELECT_COLUMNS
    );

    sqlx::query_as::<_, ScrapeResultRow>(&query)
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ScrapeResult::try_from)
        .collect()
}

/// Most recent completed row for the same url and mode created at or after `since`.
pub async fn find_cached_result(
    pool: &SqlitePool,
    url: &str,
    mode: ExtractionMode,
    since: DateTime<Utc>,
) -> Result<Option<ScrapeResult>, sqlx::Error> {
    let query = format!(
        r"{}
        where
            url = $1
            and analysis_type = $2
            and status = 'completed'
            and created_at_ms >= $3
        order by created_at_ms desc, id desc
        limit 1
        ",
        SELECT_COLUMNS
    );

    sqlx::query_as::<_, ScrapeResultRow>(&query)
        .bind(url)
        .bind(mode.as_str())
        .bind(since.timestamp_millis())
        .fetch_optional(pool)
        .await?
        .map(ScrapeResult::try_from)
        .transpose()
}

/// Deletes every row created strictly before `cutoff`.
pub async fn delete_older_than(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<SqliteQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        delete from scrape_result
        where
            created_at_ms < $1
        ",
    )
    .bind(cutoff.timestamp_millis())
    .execute(pool)
    .await
}

pub async fn count_scrape_results(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("select count(*) from scrape_result")
        .fetch_one(pool)
        .await
}
