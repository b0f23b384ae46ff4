use std::time::Duration;

use chrono::Utc;

use crate::{
    domain::{AnalysisPass, AnalysisReport, ExtractionMode, FetchedPage, ParsedPage, TargetUrl},
    services::{
        analyzers::{
            analyze_content, analyze_security, analyze_seo, collect_assets, detect_technologies,
            summarize_page,
        },
        fetcher::{FetchError, Fetcher},
        parser::parse_page,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to write extraction artifacts: {0}")]
    Artifact(#[from] std::io::Error),
}

/// Report plus the raw material it was built from, kept for artifact writing.
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub fetched: FetchedPage,
    pub parsed: ParsedPage,
}

/// Fetch, parse and classify one URL.
pub struct Analyzer {
    fetcher: Fetcher,
}

impl Analyzer {
    pub fn new(fetcher: Fetcher) -> Self {
        Analyzer { fetcher }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub async fn analyze(
        &self,
        url: &TargetUrl,
        mode: ExtractionMode,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        log::info!("Analyzing {} in {} mode", url, mode);

        let fetched = self.fetcher.fetch_page(url.as_str()).await?;
        let parsed = parse_page(&fetched.body, &fetched.final_url);
        let report = build_report(url, mode, &fetched, &parsed);

        log::info!(
            "Analyzed {} ({} links, HTTP {}, {} ms)",
            url,
            report.links_count,
            report.status_code,
            report.response_time_ms
        );

        Ok(AnalysisOutcome {
            report,
            fetched,
            parsed,
        })
    }

    /// [`Analyzer::analyze`] bounded by `timeout`.
    pub async fn analyze_with_timeout(
        &self,
        url: &TargetUrl,
        mode: ExtractionMode,
        timeout: Duration,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        tokio::time::timeout(timeout, self.analyze(url, mode))
            .await
            .map_err(|_| AnalysisError::Timeout(timeout))?
    }
}

pub fn build_report(
    url: &TargetUrl,
    mode: ExtractionMode,
    fetched: &FetchedPage,
    parsed: &ParsedPage,
) -> AnalysisReport {
    AnalysisReport {
        url: url.to_string(),
        final_url: fetched.final_url.to_string(),
        analysis_type: mode,
        status_code: fetched.status,
        response_time_ms: fetched.elapsed.as_millis() as u64,
        fetched_at: Utc::now(),
        title: parsed.title.clone(),
        links_count: parsed.links.len(),
        page: summarize_page(parsed),
        seo: mode
            .runs(AnalysisPass::Seo)
            .then(|| analyze_seo(parsed, fetched.is_https())),
        technologies: mode
            .runs(AnalysisPass::Technology)
            .then(|| detect_technologies(fetched, parsed)),
        content: mode
            .runs(AnalysisPass::Content)
            .then(|| analyze_content(parsed)),
        security: mode
            .runs(AnalysisPass::Security)
            .then(|| analyze_security(fetched, parsed)),
        assets: mode
            .runs(AnalysisPass::Assets)
            .then(|| collect_assets(parsed)),
    }
}
