//! Deterministic heuristics over a fetched and parsed page. Every analyzer is a
//! pure function; which ones run is decided by [`ExtractionMode::passes`].
//!
//! [`ExtractionMode::passes`]: crate::domain::ExtractionMode::passes

mod assets;
mod content;
mod security;
mod seo;
mod technology;

pub use assets::collect_assets;
pub use content::analyze_content;
pub use security::analyze_security;
pub use seo::analyze_seo;
pub use technology::detect_technologies;

use crate::domain::{PageSummary, ParsedPage};

/// Page basics recorded for every mode.
pub fn summarize_page(page: &ParsedPage) -> PageSummary {
    PageSummary {
        meta_description: page.meta_description.clone(),
        meta_keywords: page.meta_keywords.clone(),
        language: page.language.clone(),
        canonical: page.canonical.clone(),
        internal_links: page.internal_links(),
        external_links: page.external_links(),
        nofollow_links: page.links.iter().filter(|l| l.nofollow).count(),
        images_count: page.images.len(),
        images_missing_alt: page.images.iter().filter(|i| !i.has_alt()).count(),
        scripts_count: page.scripts.len() + page.inline_scripts,
        stylesheets_count: page.stylesheets.len(),
        forms_count: page.forms.len(),
        word_count: page.word_count(),
    }
}
