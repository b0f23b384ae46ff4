use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::domain::{
    html_tag::{Form, Heading, Image, Link, Script},
    ParsedPage,
};

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("title"));
static META_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("meta[name]"));
static LINK_REL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| parse_selector("link[rel][href]"));
static BASE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("base[href]"));
static HTML_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("html"));
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("body"));
static HEADING_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| parse_selector("h1, h2, h3, h4, h5, h6"));
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("a[href]"));
static IMAGE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("img"));
static SCRIPT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("script"));
static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("form"));
static PASSWORD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| parse_selector("input[type='password']"));
static PARAGRAPH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("p"));

const HIDDEN_TEXT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];
const SKIPPED_LINK_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

// Only ever called with the constant selectors above.
fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", css, e))
}

/// Builds the parsed view of a page. `page_url` is the final URL after redirects.
pub fn parse_page(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let base_url = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut page = ParsedPage {
        title: document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty()),
        language: document
            .select(&HTML_SELECTOR)
            .next()
            .and_then(|html| html.value().attr("lang"))
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty()),
        html_length: html.len(),
        ..Default::default()
    };

    for meta in document.select(&META_SELECTOR) {
        let name = meta.value().attr("name").unwrap_or_default().to_lowercase();
        let content = meta
            .value()
            .attr("content")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        match (name.as_str(), content) {
            ("description", Some(content)) => {
                page.meta_description.get_or_insert(content);
            }
            ("keywords", Some(content)) => {
                page.meta_keywords = content
                    .split(',')
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            ("robots", Some(content)) => {
                page.meta_robots.get_or_insert(content.to_lowercase());
            }
            ("generator", Some(content)) => {
                page.meta_generator.get_or_insert(content);
            }
            ("viewport", _) => page.has_viewport = true,
            _ => {}
        }
    }

    for link in document.select(&LINK_REL_SELECTOR) {
        let rel = link.value().attr("rel").unwrap_or_default().to_lowercase();
        let Some(href) = link
            .value()
            .attr("href")
            .and_then(|href| resolve(&base_url, href))
        else {
            continue;
        };

        if rel.split_whitespace().any(|r| r == "canonical") {
            page.canonical.get_or_insert(href);
        } else if rel.split_whitespace().any(|r| r == "stylesheet") {
            page.stylesheets.push(href);
        }
    }

    page.headings = document
        .select(&HEADING_SELECTOR)
        .filter_map(|h| {
            let level = h.value().name()[1..].parse().ok()?;
            Some(Heading {
                level,
                text: collapse_whitespace(&h.text().collect::<String>()),
            })
        })
        .collect();

    page.links = document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            let lower = href.to_lowercase();
            if href.is_empty()
                || href.starts_with('#')
                || SKIPPED_LINK_PREFIXES.iter().any(|p| lower.starts_with(p))
            {
                return None;
            }
            let resolved = base_url.join(href).ok()?;
            if !matches!(resolved.scheme(), "http" | "https") {
                return None;
            }

            Some(Link {
                internal: same_site(&resolved, page_url),
                nofollow: a
                    .value()
                    .attr("rel")
                    .is_some_and(|rel| rel.to_lowercase().contains("nofollow")),
                text: collapse_whitespace(&a.text().collect::<String>()),
                href: resolved.to_string(),
            })
        })
        .collect();

    page.images = document
        .select(&IMAGE_SELECTOR)
        .filter_map(|img| {
            let src = img
                .value()
                .attr("src")
                .or_else(|| img.value().attr("data-src"))?;
            Some(Image {
                src: resolve(&base_url, src)?,
                alt: img.value().attr("alt").map(|alt| alt.trim().to_string()),
            })
        })
        .collect();

    for script in document.select(&SCRIPT_SELECTOR) {
        match script.value().attr("src") {
            Some(src) => {
                if let Some(src) = resolve(&base_url, src) {
                    page.scripts.push(Script {
                        src,
                        has_integrity: script.value().attr("integrity").is_some(),
                    });
                }
            }
            None => {
                if !script.text().collect::<String>().trim().is_empty() {
                    page.inline_scripts += 1;
                }
            }
        }
    }

    page.forms = document
        .select(&FORM_SELECTOR)
        .map(|form| Form {
            method: form
                .value()
                .attr("method")
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "get".to_string()),
            action: form
                .value()
                .attr("action")
                .filter(|a| !a.trim().is_empty())
                .and_then(|a| resolve(&base_url, a))
                .unwrap_or_else(|| page_url.to_string()),
            has_password_field: form.select(&PASSWORD_SELECTOR).next().is_some(),
        })
        .collect();

    page.paragraphs = document
        .select(&PARAGRAPH_SELECTOR)
        .filter(|p| p.text().any(|t| !t.trim().is_empty()))
        .count();

    let body = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());
    page.text = visible_text(body);

    page
}

fn visible_text(root: ElementRef) -> String {
    let mut words: Vec<&str> = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_TEXT_TAGS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

fn same_site(url: &Url, page_url: &Url) -> bool {
    fn bare_host(url: &Url) -> Option<String> {
        url.host_str()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    }
    bare_host(url) == bare_host(page_url)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::parse_page;

    const PAGE: &str = r##"<!doctype html>
<html lang="en">
<head>
  <title>  Example
     Domain </title>
  <meta name="description" content="An example page used in fixtures.">
  <meta name="keywords" content="Example, Fixture , ">
  <meta name="viewport" content="width=device-width">
  <meta name="generator" content="WordPress 6.4.2">
  <link rel="canonical" href="/home">
  <link rel="stylesheet" href="/static/site.css">
  <script src="https://cdn.example.net/lib.js" integrity="sha384-abc"></script>
  <script>window.dataLayer = [];</script>
  <style>body { color: red; }</style>
</head>
<body>
  <h1>Welcome</h1>
  <h2>About</h2>
  <p>This   page exists for tests.</p>
  <p> </p>
  <a href="/about">About us</a>
  <a href="https://www.example.com/contact">Contact</a>
  <a href="https://other.org/" rel="nofollow noopener">Elsewhere</a>
  <a href="#top">Top</a>
  <a href="mailto:hi@example.com">Mail</a>
  <a href="javascript:void(0)">Nothing</a>
  <img src="/logo.png" alt="Logo">
  <img src="/hero.jpg">
  <form method="POST" action="/login"><input type="password" name="pw"></form>
  <form><input type="text" name="q"></form>
  <noscript>Enable JavaScript</noscript>
</body>
</html>"##;

    fn parsed() -> crate::domain::ParsedPage {
        parse_page(PAGE, &Url::parse("https://example.com/index.html").unwrap())
    }

    #[test]
    fn extracts_head_metadata() {
        let page = parsed();
        assert_eq!(page.title.as_deref(), Some("Example Domain"));
        assert_eq!(
            page.meta_description.as_deref(),
            Some("An example page used in fixtures.")
        );
        assert_eq!(page.meta_keywords, vec!["example", "fixture"]);
        assert_eq!(page.meta_generator.as_deref(), Some("WordPress 6.4.2"));
        assert!(page.has_viewport);
        assert_eq!(page.canonical.as_deref(), Some("https://example.com/home"));
        assert_eq!(page.language.as_deref(), Some("en"));
        assert_eq!(page.stylesheets, vec!["https://example.com/static/site.css"]);
    }

    #[test]
    fn classifies_links_and_skips_non_navigational_ones() {
        let page = parsed();
        assert_eq!(page.links.len(), 3);
        assert_eq!(page.internal_links(), 2);
        assert_eq!(page.external_links(), 1);
        assert_eq!(page.links[0].href, "https://example.com/about");
        assert!(page.links[2].nofollow);
    }

    #[test]
    fn collects_images_scripts_and_forms() {
        let page = parsed();
        assert_eq!(page.images.len(), 2);
        assert_eq!(page.images.iter().filter(|i| !i.has_alt()).count(), 1);

        assert_eq!(page.scripts.len(), 1);
        assert!(page.scripts[0].has_integrity);
        assert_eq!(page.inline_scripts, 1);

        assert_eq!(page.forms.len(), 2);
        assert_eq!(page.forms[0].method, "post");
        assert_eq!(page.forms[0].action, "https://example.com/login");
        assert!(page.forms[0].has_password_field);
        assert_eq!(page.forms[1].method, "get");
        assert_eq!(page.forms[1].action, "https://example.com/index.html");
    }

    #[test]
    fn visible_text_excludes_scripts_and_styles() {
        let page = parsed();
        assert!(page.text.contains("This page exists for tests."));
        assert!(!page.text.contains("dataLayer"));
        assert!(!page.text.contains("color: red"));
        assert!(!page.text.contains("Enable JavaScript"));
        assert_eq!(page.paragraphs, 1);
        assert_eq!(page.headings.len(), 2);
        assert_eq!(page.headings_at(1), 1);
    }

    #[test]
    fn base_tag_changes_resolution() {
        let html = r#"<html><head><base href="https://cdn.example.com/assets/"></head>
            <body><img src="a.png" alt=""></body></html>"#;
        let page = parse_page(html, &Url::parse("https://example.com/").unwrap());
        assert_eq!(page.images[0].src, "https://cdn.example.com/assets/a.png");
        assert!(page.images[0].has_alt());
    }

    #[test]
    fn empty_document_has_no_title() {
        let page = parse_page("", &Url::parse("https://example.com/").unwrap());
        assert!(page.title.is_none());
        assert!(page.links.is_empty());
        assert_eq!(page.word_count(), 0);
    }
}
