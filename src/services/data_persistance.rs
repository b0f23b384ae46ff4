use sqlx::SqlitePool;
use tokio::sync::mpsc::Receiver;

use crate::{dal::scrape_result_db, domain::AnalysisReport};

/// State changes produced by workers, applied in arrival order by a single writer.
#[derive(Debug)]
pub enum PersistantData {
    Processing(i64),
    Completed {
        id: i64,
        report: Box<AnalysisReport>,
    },
    Failed {
        id: i64,
        error: String,
    },
}

pub async fn data_persistance_handler(
    mut data_receiver: Receiver<PersistantData>,
    pool: SqlitePool,
) {
    log::info!("Started data persistance handler");

    while let Some(data) = data_receiver.recv().await {
        log::debug!(
            "Data persistance handler has {} elements",
            data_receiver.len()
        );

        if let Err(e) = persist(&pool, data).await {
            log::error!("Failed to persist analysis state: {:?}", e);
        }
    }

    log::info!("Data persistance channel closed, handler stopping");
}

async fn persist(pool: &SqlitePool, data: PersistantData) -> Result<(), sqlx::Error> {
    match data {
        PersistantData::Processing(id) => {
            if !scrape_result_db::mark_processing(pool, id).await? {
                log::warn!("Result {} is no longer pending, not marking processing", id);
            }
        }
        PersistantData::Completed { id, report } => {
            if !scrape_result_db::mark_completed(pool, id, &report, None).await? {
                log::warn!("Result {} is already terminal, dropping completed report", id);
            }
        }
        PersistantData::Failed { id, error } => {
            if !scrape_result_db::mark_failed(pool, id, &error).await? {
                log::warn!("Result {} is already terminal, dropping failure: {}", id, error);
            }
        }
    }

    Ok(())
}
