use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{extraction_mode::ExtractionMode, report::AnalysisReport, scrape_status::ScrapeStatus};

/// The single persisted record of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeResult {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub analysis_type: ExtractionMode,
    pub status: ScrapeStatus,
    pub result_data: Option<AnalysisReport>,
    pub error_message: Option<String>,
    pub output_dir: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
