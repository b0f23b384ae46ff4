use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use url::Url;

use super::{analyzers::collect_assets, fetcher::Fetcher, pipeline::AnalysisOutcome};

pub const CONTENT_DIR: &str = "01_content";
pub const ASSETS_DIR: &str = "02_assets";
pub const ANALYSIS_DIR: &str = "03_analysis";
pub const EXPORTS_DIR: &str = "04_exports";

const CONCURRENT_DOWNLOADS: usize = 4;
const MAX_FILE_STEM: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Css,
    Js,
    Images,
}

impl AssetKind {
    fn dir(&self) -> &'static str {
        match self {
            AssetKind::Css => "css",
            AssetKind::Js => "js",
            AssetKind::Images => "images",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssetRecord {
    pub url: String,
    pub kind: AssetKind,
    /// Path relative to the assets folder, set when the download succeeded.
    pub file: Option<String>,
    pub error: Option<String>,
}

/// Writes the numbered extraction folders for one synchronous extraction.
pub struct ArtifactWriter {
    root: PathBuf,
    max_asset_downloads: usize,
}

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>, max_asset_downloads: usize) -> Self {
        ArtifactWriter {
            root: root.into(),
            max_asset_downloads,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn write(
        &self,
        fetcher: &Fetcher,
        outcome: &AnalysisOutcome,
    ) -> Result<PathBuf, std::io::Error> {
        let host = outcome.fetched.final_url.host_str().unwrap_or("unknown");
        let dir = self.root.join(folder_name(host, Utc::now()));

        for sub in [CONTENT_DIR, ASSETS_DIR, ANALYSIS_DIR, EXPORTS_DIR] {
            tokio::fs::create_dir_all(dir.join(sub)).await?;
        }

        let content = dir.join(CONTENT_DIR);
        tokio::fs::write(content.join("page.html"), &outcome.fetched.body).await?;
        tokio::fs::write(content.join("text.txt"), &outcome.parsed.text).await?;

        let manifest = self.download_assets(fetcher, outcome, &dir.join(ASSETS_DIR)).await?;
        tokio::fs::write(
            dir.join(ASSETS_DIR).join("manifest.json"),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;

        tokio::fs::write(
            dir.join(ANALYSIS_DIR).join("report.json"),
            serde_json::to_vec_pretty(&outcome.report)?,
        )
        .await?;

        log::info!(
            "Wrote extraction artifacts for {} to {}",
            outcome.report.url,
            dir.display()
        );
        Ok(dir)
    }

    async fn download_assets(
        &self,
        fetcher: &Fetcher,
        outcome: &AnalysisOutcome,
        assets_dir: &Path,
    ) -> Result<Vec<AssetRecord>, std::io::Error> {
        let inventory = outcome
            .report
            .assets
            .clone()
            .unwrap_or_else(|| collect_assets(&outcome.parsed));

        let assets: Vec<(AssetKind, String)> = inventory
            .stylesheets
            .into_iter()
            .map(|u| (AssetKind::Css, u))
            .chain(inventory.scripts.into_iter().map(|u| (AssetKind::Js, u)))
            .chain(inventory.images.into_iter().map(|u| (AssetKind::Images, u)))
            .collect();

        for kind in [AssetKind::Css, AssetKind::Js, AssetKind::Images] {
            tokio::fs::create_dir_all(assets_dir.join(kind.dir())).await?;
        }

        let limit = self.max_asset_downloads;
        let records = stream::iter(assets.into_iter().enumerate())
            .map(|(index, (kind, url))| async move {
                if index >= limit {
                    return AssetRecord {
                        url,
                        kind,
                        file: None,
                        error: None,
                    };
                }

                let file = format!("{}/{:03}_{}", kind.dir(), index, file_name(&url));
                let result = match fetcher.fetch_bytes(&url).await {
                    Ok(bytes) => tokio::fs::write(assets_dir.join(&file), bytes)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };

                match result {
                    Ok(()) => AssetRecord {
                        url,
                        kind,
                        file: Some(file),
                        error: None,
                    },
                    Err(error) => {
                        log::warn!("Failed to download asset {}: {}", url, error);
                        AssetRecord {
                            url,
                            kind,
                            file: None,
                            error: Some(error),
                        }
                    }
                }
            })
            .buffered(CONCURRENT_DOWNLOADS)
            .collect::<Vec<_>>()
            .await;

        Ok(records)
    }
}

/// `<host>_<yyyymmddHHMMSS>_<short-id>`
pub fn folder_name(host: &str, now: DateTime<Utc>) -> String {
    let short_id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        sanitize(host),
        now.format("%Y%m%d%H%M%S"),
        &short_id[..8]
    )
}

fn file_name(url: &str) -> String {
    let name = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "asset".to_string());

    sanitize(&name).chars().take(MAX_FILE_STEM).collect()
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
