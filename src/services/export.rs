use std::path::Path;

use serde_json::json;

use crate::domain::{ScrapeResult, ScrapeStatus};

use super::artifacts::EXPORTS_DIR;

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("result {id} is {status} and cannot be exported yet")]
    NotCompleted { id: i64, status: ScrapeStatus },
    #[error("failed to write export: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub fn export_result(result: &ScrapeResult) -> Result<serde_json::Value, ExportError> {
    if result.status != ScrapeStatus::Completed {
        return Err(ExportError::NotCompleted {
            id: result.id,
            status: result.status,
        });
    }

    Ok(json!({
        "id": result.id,
        "url": result.url,
        "title": result.title,
        "analysis_type": result.analysis_type,
        "status": result.status,
        "created_at": result.created_at,
        "completed_at": result.completed_at,
        "result": result.result_data,
    }))
}

/// Builds the export and, when the row owns an artifact folder, stores it as
/// `04_exports/result.json`.
pub async fn export_and_store(result: &ScrapeResult) -> Result<serde_json::Value, ExportError> {
    let export = export_result(result)?;

    if let Some(output_dir) = &result.output_dir {
        let dir = Path::new(output_dir).join(EXPORTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("result.json"), serde_json::to_vec_pretty(&export)?).await?;
    }

    Ok(export)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::domain::ExtractionMode;

    fn result(status: ScrapeStatus, output_dir: Option<String>) -> ScrapeResult {
        ScrapeResult {
            id: 3,
            url: "https://example.com/".to_string(),
            title: Some("Example".to_string()),
            analysis_type: ExtractionMode::Basic,
            status,
            result_data: None,
            error_message: None,
            output_dir,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    fn keys(value: &serde_json::Value) -> BTreeSet<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn export_round_trips_with_the_same_keys() {
        let export = export_result(&result(ScrapeStatus::Completed, None)).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&export).unwrap()).unwrap();

        assert_eq!(keys(&export), keys(&parsed));
        assert_eq!(
            keys(&parsed),
            [
                "analysis_type",
                "completed_at",
                "created_at",
                "id",
                "result",
                "status",
                "title",
                "url"
            ]
            .into_iter()
            .map(String::from)
            .collect()
        );
        assert_eq!(parsed["status"], "completed");
        assert_eq!(parsed["analysis_type"], "basic");
    }

    #[test]
    fn unfinished_results_are_refused() {
        for status in [ScrapeStatus::Pending, ScrapeStatus::Processing, ScrapeStatus::Failed] {
            let err = export_result(&result(status, None)).unwrap_err();
            assert!(matches!(err, ExportError::NotCompleted { id: 3, .. }));
        }
    }

    #[tokio::test]
    async fn stores_export_next_to_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let row = result(
            ScrapeStatus::Completed,
            Some(dir.path().to_string_lossy().into_owned()),
        );

        let export = export_and_store(&row).await.unwrap();

        let stored: serde_json::Value = serde_json::from_slice(
            &std::fs::read(dir.path().join(EXPORTS_DIR).join("result.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stored, export);
    }
}
