use itertools::Itertools;

use crate::domain::{AssetInventory, ParsedPage};

/// Absolute URLs of stylesheets, scripts and images, deduplicated in page order.
pub fn collect_assets(page: &ParsedPage) -> AssetInventory {
    AssetInventory {
        stylesheets: page.stylesheets.iter().unique().cloned().collect(),
        scripts: page.scripts.iter().map(|s| s.src.clone()).unique().collect(),
        images: page.images.iter().map(|i| i.src.clone()).unique().collect(),
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::services::parser::parse_page;

    #[test]
    fn deduplicates_and_resolves() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/a.css"><link rel="stylesheet" href="https://example.com/a.css">
            <script src="/app.js"></script><script src="app.js"></script><script>inline()</script>
            </head><body><img src="/logo.png"><img src="/logo.png"><img data-src="/lazy.png"></body></html>"#;
        let page = parse_page(html, &Url::parse("https://example.com/").unwrap());
        let assets = collect_assets(&page);

        assert_eq!(assets.stylesheets, vec!["https://example.com/a.css"]);
        assert_eq!(assets.scripts, vec!["https://example.com/app.js"]);
        assert_eq!(
            assets.images,
            vec!["https://example.com/logo.png", "https://example.com/lazy.png"]
        );
        assert_eq!(assets.len(), 4);
    }
}
