use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    configuration::CacheSettings,
    dal::scrape_result_db,
    domain::{ExtractionMode, ScrapeResult, TargetUrl},
};

/// Latest completed result for the same URL and mode younger than the TTL.
pub async fn lookup_cached(
    pool: &SqlitePool,
    settings: &CacheSettings,
    url: &TargetUrl,
    mode: ExtractionMode,
) -> Result<Option<ScrapeResult>, sqlx::Error> {
    if !settings.enabled {
        return Ok(None);
    }

    let ttl = chrono::Duration::from_std(settings.ttl()).unwrap_or(chrono::Duration::MAX);
    let since = Utc::now()
        .checked_sub_signed(ttl)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

    let cached = scrape_result_db::find_cached_result(pool, url.as_str(), mode, since).await?;
    if let Some(hit) = &cached {
        log::info!("Cache hit for {} ({}): result {}", url, mode, hit.id);
    }

    Ok(cached)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        dal::scrape_result_db,
        domain::{AnalysisReport, PageSummary},
    };

    fn settings(enabled: bool, ttl_secs: u64) -> CacheSettings {
        CacheSettings {
            enabled,
            ttl_secs,
            max_age_hours: 1,
            cleanup_interval_secs: 0,
        }
    }

    fn report(url: &str) -> AnalysisReport {
        AnalysisReport {
            url: url.to_string(),
            final_url: url.to_string(),
            analysis_type: ExtractionMode::Standard,
            status_code: 200,
            response_time_ms: 12,
            fetched_at: Utc::now(),
            title: Some("Cached".to_string()),
            links_count: 0,
            page: PageSummary {
                meta_description: None,
                meta_keywords: vec![],
                language: None,
                canonical: None,
                internal_links: 0,
                external_links: 0,
                nofollow_links: 0,
                images_count: 0,
                images_missing_alt: 0,
                scripts_count: 0,
                stylesheets_count: 0,
                forms_count: 0,
                word_count: 0,
            },
            seo: None,
            technologies: None,
            content: None,
            security: None,
            assets: None,
        }
    }

    #[tokio::test]
    async fn hits_fresh_completed_results_only() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let url = TargetUrl::parse("https://example.com").unwrap();

        scrape_result_db::insert_completed(
            &pool,
            &report(url.as_str()),
            None,
            Utc::now() - Duration::hours(2),
        )
        .await
        .unwrap();

        let stale = lookup_cached(&pool, &settings(true, 3600), &url, ExtractionMode::Standard)
            .await
            .unwrap();
        assert!(stale.is_none());

        let id = scrape_result_db::insert_completed(&pool, &report(url.as_str()), None, Utc::now())
            .await
            .unwrap();

        let fresh = lookup_cached(&pool, &settings(true, 3600), &url, ExtractionMode::Standard)
            .await
            .unwrap();
        assert_eq!(fresh.map(|r| r.id), Some(id));

        let other_mode = lookup_cached(&pool, &settings(true, 3600), &url, ExtractionMode::Ultra)
            .await
            .unwrap();
        assert!(other_mode.is_none());

        let disabled = lookup_cached(&pool, &settings(false, 3600), &url, ExtractionMode::Standard)
            .await
            .unwrap();
        assert!(disabled.is_none());
    }
}
