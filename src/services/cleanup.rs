use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::time;

use crate::{configuration::CacheSettings, dal::scrape_result_db};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub rows_deleted: u64,
    pub dirs_deleted: u64,
}

/// Deletes rows created before `now - max_age` and artifact folders whose
/// modification time is older than the same threshold.
pub async fn purge_older_than(
    pool: &SqlitePool,
    output_dir: &Path,
    max_age: Duration,
) -> anyhow::Result<CleanupReport> {
    let cutoff = chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .context("Cleanup age out of range")?;

    let rows_deleted = scrape_result_db::delete_older_than(pool, cutoff)
        .await
        .context("Failed to delete old scrape results")?
        .rows_affected();

    let dir_cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let dirs_deleted = remove_stale_dirs(output_dir, dir_cutoff)
        .await
        .with_context(|| format!("Failed to clean {}", output_dir.display()))?;

    Ok(CleanupReport {
        rows_deleted,
        dirs_deleted,
    })
}

async fn remove_stale_dirs(root: &Path, cutoff: SystemTime) -> std::io::Result<u64> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut stale = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_dir() && metadata.modified()? < cutoff {
            stale.push(entry.path());
        }
    }

    Ok(remove_dirs(stale).await)
}

/// A folder that cannot be removed is logged and skipped.
async fn remove_dirs(dirs: Vec<PathBuf>) -> u64 {
    let mut removed = 0;
    for dir in dirs {
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => removed += 1,
            Err(e) => log::warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }
    removed
}

pub async fn cache_cleanup_handler(pool: SqlitePool, output_dir: PathBuf, settings: CacheSettings) {
    if settings.cleanup_interval_secs == 0 {
        log::info!("Periodic cache cleanup disabled");
        return;
    }

    log::info!(
        "Started cache cleanup handler, every {} seconds",
        settings.cleanup_interval_secs
    );
    let mut interval = time::interval(Duration::from_secs(settings.cleanup_interval_secs));

    loop {
        interval.tick().await;

        match purge_older_than(&pool, &output_dir, settings.max_age()).await {
            Ok(report) if report.rows_deleted > 0 || report.dirs_deleted > 0 => log::info!(
                "Cache cleanup removed {} rows and {} folders",
                report.rows_deleted,
                report.dirs_deleted
            ),
            Ok(_) => {}
            Err(e) => log::error!("Cache cleanup failed: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;
    use crate::domain::ExtractionMode;

    fn age_dir(path: &Path, age: Duration) {
        std::fs::create_dir_all(path).unwrap();
        File::open(path)
            .unwrap()
            .set_modified(SystemTime::now() - age)
            .unwrap();
    }

    #[tokio::test]
    async fn removes_only_old_rows_and_folders() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let root = tempfile::tempdir().unwrap();

        let day = Duration::from_secs(24 * 60 * 60);
        let old = Utc::now() - chrono::Duration::days(3);
        scrape_result_db::insert_pending(&pool, "https://old.example/", ExtractionMode::Basic, old)
            .await
            .unwrap();
        let fresh_id = scrape_result_db::insert_pending(
            &pool,
            "https://new.example/",
            ExtractionMode::Basic,
            Utc::now(),
        )
        .await
        .unwrap();

        age_dir(&root.path().join("old.example_20240101000000_aaaaaaaa"), day * 3);
        age_dir(&root.path().join("new.example_20240104000000_bbbbbbbb"), Duration::ZERO);
        std::fs::write(root.path().join("stray.txt"), "keep").unwrap();

        let report = purge_older_than(&pool, root.path(), day).await.unwrap();

        assert_eq!(
            report,
            CleanupReport {
                rows_deleted: 1,
                dirs_deleted: 1
            }
        );
        assert_eq!(scrape_result_db::count_scrape_results(&pool).await.unwrap(), 1);
        assert!(scrape_result_db::get_scrape_result(&pool, fresh_id)
            .await
            .unwrap()
            .is_some());
        assert!(!root.path().join("old.example_20240101000000_aaaaaaaa").exists());
        assert!(root.path().join("new.example_20240104000000_bbbbbbbb").exists());
        assert!(root.path().join("stray.txt").exists());
    }

    #[tokio::test]
    async fn missing_output_dir_is_not_an_error() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let root = tempfile::tempdir().unwrap();

        let report = purge_older_than(&pool, &root.path().join("absent"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    #[tokio::test]
    async fn failed_removal_does_not_stop_the_sweep() {
        let root = tempfile::tempdir().unwrap();
        let gone = root.path().join("already_gone");
        let stale = root.path().join("stale");
        std::fs::create_dir_all(stale.join("01_content")).unwrap();

        let removed = remove_dirs(vec![gone, stale.clone()]).await;

        assert_eq!(removed, 1);
        assert!(!stale.exists());
    }
}
