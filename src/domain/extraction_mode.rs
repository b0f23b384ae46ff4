use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named preset controlling which heuristic passes run over a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Basic,
    #[default]
    Standard,
    Advanced,
    Ultra,
    Secure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPass {
    Seo,
    Technology,
    Content,
    Security,
    Assets,
}

impl ExtractionMode {
    pub const ALL: [ExtractionMode; 5] = [
        ExtractionMode::Basic,
        ExtractionMode::Standard,
        ExtractionMode::Advanced,
        ExtractionMode::Ultra,
        ExtractionMode::Secure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Basic => "basic",
            ExtractionMode::Standard => "standard",
            ExtractionMode::Advanced => "advanced",
            ExtractionMode::Ultra => "ultra",
            ExtractionMode::Secure => "secure",
        }
    }

    /// Passes that run on top of the page basics every mode gets.
    pub fn passes(&self) -> &'static [AnalysisPass] {
        use AnalysisPass::*;

        match self {
            ExtractionMode::Basic => &[],
            ExtractionMode::Standard => &[Seo],
            ExtractionMode::Advanced => &[Seo, Technology, Content],
            ExtractionMode::Ultra => &[Seo, Technology, Content, Security, Assets],
            ExtractionMode::Secure => &[Technology, Security],
        }
    }

    pub fn runs(&self, pass: AnalysisPass) -> bool {
        self.passes().contains(&pass)
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(ExtractionMode::Basic),
            "standard" => Ok(ExtractionMode::Standard),
            "advanced" => Ok(ExtractionMode::Advanced),
            "ultra" => Ok(ExtractionMode::Ultra),
            "secure" => Ok(ExtractionMode::Secure),
            other => Err(format!(
                "Unknown analysis type '{}'. Expected one of: basic, standard, advanced, ultra, secure",
                other
            )),
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
