use std::{sync::Arc, time::Duration};

use tokio::sync::{
    mpsc::{error::TrySendError, Receiver, Sender},
    Semaphore,
};

use crate::domain::{ExtractionMode, TargetUrl};

use super::{pipeline::Analyzer, PersistantData};

#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: i64,
    pub url: TargetUrl,
    pub mode: ExtractionMode,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SubmitError {
    #[error("analysis queue is full")]
    Full,
    #[error("analysis queue is closed")]
    Closed,
}

/// Producer side of the bounded job queue, shared with the routes.
#[derive(Clone)]
pub struct AnalysisQueue {
    pub sender: Sender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Enqueues without waiting; a full queue is reported, never awaited.
    pub fn submit(&self, job: AnalysisJob) -> Result<(), SubmitError> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::Full,
            TrySendError::Closed(_) => SubmitError::Closed,
        })
    }
}

pub async fn analysis_worker_handler(
    mut job_receiver: Receiver<AnalysisJob>,
    analyzer: Arc<Analyzer>,
    persistant_data_sender: Sender<PersistantData>,
    pool_size: usize,
    job_timeout: Duration,
) {
    log::info!("Started analysis worker pool with {} workers", pool_size);
    let permits = Arc::new(Semaphore::new(pool_size.max(1)));

    while let Some(job) = job_receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            log::error!("Worker pool semaphore closed, dropping job {}", job.id);
            break;
        };
        log::debug!(
            "Dispatching job {}, {} jobs waiting",
            job.id,
            job_receiver.len()
        );

        let analyzer = analyzer.clone();
        let persistant_data_sender = persistant_data_sender.clone();
        tokio::spawn(async move {
            run_job(job, &analyzer, &persistant_data_sender, job_timeout).await;
            drop(permit);
        });
    }

    log::info!("Analysis job queue closed, worker pool stopping");
}

async fn run_job(
    job: AnalysisJob,
    analyzer: &Analyzer,
    persistant_data_sender: &Sender<PersistantData>,
    job_timeout: Duration,
) {
    send(persistant_data_sender, PersistantData::Processing(job.id)).await;

    let data = match analyzer
        .analyze_with_timeout(&job.url, job.mode, job_timeout)
        .await
    {
        Ok(outcome) => PersistantData::Completed {
            id: job.id,
            report: Box::new(outcome.report),
        },
        Err(e) => {
            log::warn!("Analysis {} of {} failed: {}", job.id, job.url, e);
            PersistantData::Failed {
                id: job.id,
                error: e.to_string(),
            }
        }
    };

    send(persistant_data_sender, data).await;
}

async fn send(sender: &Sender<PersistantData>, data: PersistantData) {
    if let Err(e) = sender.send(data).await {
        log::error!("Persistance channel closed, lost update: {:?}", e.0);
    }
}
