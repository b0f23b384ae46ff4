use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{extraction_mode::ExtractionMode, html_tag::Heading};

/// Typed result of one analysis run, stored as the `result_data` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub url: String,
    pub final_url: String,
    pub analysis_type: ExtractionMode,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub fetched_at: DateTime<Utc>,
    pub title: Option<String>,
    pub links_count: usize,
    pub page: PageSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<DetectedTechnology>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<AssetInventory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub meta_description: Option<String>,
    pub meta_keywords: Vec<String>,
    pub language: Option<String>,
    pub canonical: Option<String>,
    pub internal_links: usize,
    pub external_links: usize,
    pub nofollow_links: usize,
    pub images_count: usize,
    pub images_missing_alt: usize,
    pub scripts_count: usize,
    pub stylesheets_count: usize,
    pub forms_count: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoReport {
    pub score: u8,
    pub grade: char,
    pub issues: Vec<SeoIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoIssue {
    pub check: String,
    pub message: String,
    pub penalty: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnologySource {
    Header,
    MetaGenerator,
    ScriptSrc,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedTechnology {
    pub name: String,
    pub category: String,
    pub source: TechnologySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReport {
    pub word_count: usize,
    pub paragraph_count: usize,
    pub avg_words_per_paragraph: f64,
    pub text_to_html_ratio: f64,
    pub heading_outline: Vec<Heading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Info => 0,
            Severity::Low => 5,
            Severity::Medium => 10,
            Severity::High => 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub check: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub https: bool,
    pub score: u8,
    pub findings: Vec<SecurityFinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetInventory {
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    pub images: Vec<String>,
}

impl AssetInventory {
    pub fn len(&self) -> usize {
        self.stylesheets.len() + self.scripts.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
