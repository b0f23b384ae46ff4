use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Serialize, sqlx::FromRow, Debug, PartialEq)]
pub struct StatusStat {
    pub status: String,
    pub total: i64,
}

pub async fn get_status_stats(pool: &SqlitePool) -> Result<Vec<StatusStat>, sqlx::Error> {
    sqlx::query_as::<_, StatusStat>(
        r#"
        select
            status,
            count(*) as total
        from
            scrape_result
        group by
            status
        order by
            status
        "#,
    )
    .fetch_all(pool)
    .await
}

#[derive(Serialize, sqlx::FromRow, Debug, PartialEq)]
pub struct ModeStat {
    pub analysis_type: String,
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
}

pub async fn get_mode_stats(pool: &SqlitePool) -> Result<Vec<ModeStat>, sqlx::Error> {
    sqlx::query_as::<_, ModeStat>(
        r#"
        select
            analysis_type,
            count(*) as total,
            sum(case when status = 'completed' then 1 else 0 end) as completed,
            sum(case when status = 'failed' then 1 else 0 end) as failed
        from
            scrape_result
        group by
            analysis_type
        order by
            analysis_type
        "#,
    )
    .fetch_all(pool)
    .await
}
