use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{DetectedTechnology, FetchedPage, ParsedPage, TechnologySource};

/// Static fingerprint. Patterns are case-insensitive regexes; a first capture
/// group, when present, is reported as the version.
struct Fingerprint {
    name: &'static str,
    category: &'static str,
    headers: &'static [(&'static str, &'static str)],
    meta_generator: Option<&'static str>,
    script_src: Option<&'static str>,
    html: Option<&'static str>,
}

const FINGERPRINTS: &[Fingerprint] = &[
    Fingerprint {
        name: "WordPress",
        category: "cms",
        headers: &[("link", r"rel=.https://api\.w\.org/")],
        meta_generator: Some(r"wordpress\s*([\d.]+)?"),
        script_src: Some(r"/wp-(?:content|includes)/"),
        html: Some(r"/wp-content/"),
    },
    Fingerprint {
        name: "Drupal",
        category: "cms",
        headers: &[("x-generator", r"drupal\s*(\d+)?"), ("x-drupal-cache", r".")],
        meta_generator: Some(r"drupal\s*(\d+)?"),
        script_src: Some(r"/sites/(?:all|default)/"),
        html: Some(r"drupal-settings-json"),
    },
    Fingerprint {
        name: "Joomla",
        category: "cms",
        headers: &[],
        meta_generator: Some(r"joomla!?\s*([\d.]+)?"),
        script_src: Some(r"/media/jui/"),
        html: None,
    },
    Fingerprint {
        name: "Ghost",
        category: "cms",
        headers: &[],
        meta_generator: Some(r"ghost\s*([\d.]+)?"),
        script_src: None,
        html: None,
    },
    Fingerprint {
        name: "Shopify",
        category: "ecommerce",
        headers: &[("x-shopid", r"."), ("x-shopify-stage", r".")],
        meta_generator: None,
        script_src: Some(r"cdn\.shopify\.com"),
        html: Some(r"Shopify\.theme"),
    },
    Fingerprint {
        name: "Wix",
        category: "site_builder",
        headers: &[("x-wix-request-id", r".")],
        meta_generator: Some(r"wix\.com"),
        script_src: Some(r"static\.parastorage\.com"),
        html: None,
    },
    Fingerprint {
        name: "Squarespace",
        category: "site_builder",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"static1?\.squarespace\.com"),
        html: Some(r"Static\.SQUARESPACE_CONTEXT"),
    },
    Fingerprint {
        name: "Next.js",
        category: "framework",
        headers: &[("x-powered-by", r"next\.js\s*([\d.]+)?")],
        meta_generator: None,
        script_src: Some(r"/_next/static/"),
        html: Some(r#"id="__NEXT_DATA__""#),
    },
    Fingerprint {
        name: "Nuxt.js",
        category: "framework",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"/_nuxt/"),
        html: Some(r"window\.__NUXT__"),
    },
    Fingerprint {
        name: "Gatsby",
        category: "framework",
        headers: &[],
        meta_generator: Some(r"gatsby\s*([\d.]+)?"),
        script_src: None,
        html: Some(r#"id="___gatsby""#),
    },
    Fingerprint {
        name: "React",
        category: "javascript_library",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"react(?:-dom)?(?:\.production)?(?:\.min)?\.js|/react@([\d.]+)"),
        html: Some(r"data-reactroot"),
    },
    Fingerprint {
        name: "Vue.js",
        category: "javascript_library",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"vue(?:\.runtime)?(?:\.global)?(?:\.min)?\.js|/vue@([\d.]+)"),
        html: Some(r"data-v-[0-9a-f]{8}"),
    },
    Fingerprint {
        name: "Angular",
        category: "javascript_library",
        headers: &[],
        meta_generator: None,
        script_src: None,
        html: Some(r#"ng-version="([\d.]+)""#),
    },
    Fingerprint {
        name: "jQuery",
        category: "javascript_library",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"jquery[.-]?([\d.]+\d)?(?:\.min)?\.js"),
        html: None,
    },
    Fingerprint {
        name: "Bootstrap",
        category: "ui_framework",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"bootstrap(?:\.bundle)?(?:\.min)?\.js|/bootstrap@([\d.]+)"),
        html: Some(r"bootstrap(?:\.min)?\.css"),
    },
    Fingerprint {
        name: "Google Analytics",
        category: "analytics",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"google-analytics\.com/|googletagmanager\.com/gtag/js"),
        html: None,
    },
    Fingerprint {
        name: "Google Tag Manager",
        category: "analytics",
        headers: &[],
        meta_generator: None,
        script_src: Some(r"googletagmanager\.com/gtm\.js"),
        html: Some(r"googletagmanager\.com/ns\.html"),
    },
    Fingerprint {
        name: "Cloudflare",
        category: "cdn",
        headers: &[("server", r"cloudflare"), ("cf-ray", r".")],
        meta_generator: None,
        script_src: Some(r"cdnjs\.cloudflare\.com"),
        html: None,
    },
    Fingerprint {
        name: "Nginx",
        category: "web_server",
        headers: &[("server", r"nginx(?:/([\d.]+))?")],
        meta_generator: None,
        script_src: None,
        html: None,
    },
    Fingerprint {
        name: "Apache",
        category: "web_server",
        headers: &[("server", r"apache(?:/([\d.]+))?")],
        meta_generator: None,
        script_src: None,
        html: None,
    },
    Fingerprint {
        name: "Microsoft IIS",
        category: "web_server",
        headers: &[("server", r"microsoft-iis(?:/([\d.]+))?")],
        meta_generator: None,
        script_src: None,
        html: None,
    },
    Fingerprint {
        name: "PHP",
        category: "language",
        headers: &[("x-powered-by", r"php(?:/([\d.]+))?")],
        meta_generator: None,
        script_src: None,
        html: None,
    },
    Fingerprint {
        name: "ASP.NET",
        category: "framework",
        headers: &[
            ("x-powered-by", r"asp\.net"),
            ("x-aspnet-version", r"([\d.]+)"),
        ],
        meta_generator: None,
        script_src: None,
        html: Some(r"__VIEWSTATE"),
    },
    Fingerprint {
        name: "Express",
        category: "framework",
        headers: &[("x-powered-by", r"^express$")],
        meta_generator: None,
        script_src: None,
        html: None,
    },
];

struct CompiledFingerprint {
    fingerprint: &'static Fingerprint,
    headers: Vec<(&'static str, Regex)>,
    meta_generator: Option<Regex>,
    script_src: Option<Regex>,
    html: Option<Regex>,
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::error!("Invalid fingerprint pattern '{}': {}", pattern, e);
            None
        }
    }
}

static COMPILED: LazyLock<Vec<CompiledFingerprint>> = LazyLock::new(|| {
    FINGERPRINTS
        .iter()
        .map(|fingerprint| CompiledFingerprint {
            fingerprint,
            headers: fingerprint
                .headers
                .iter()
                .filter_map(|(name, pattern)| compile(pattern).map(|re| (*name, re)))
                .collect(),
            meta_generator: fingerprint.meta_generator.and_then(compile),
            script_src: fingerprint.script_src.and_then(compile),
            html: fingerprint.html.and_then(compile),
        })
        .collect()
});

/// Returns the first match and its optional version capture.
fn find_version<'a, I>(regex: &Regex, haystacks: I) -> Option<Option<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    haystacks.into_iter().find_map(|haystack| {
        regex.captures(haystack).map(|caps| {
            caps.get(1)
                .map(|m| m.as_str().trim_end_matches('.').to_string())
                .filter(|v| !v.is_empty())
        })
    })
}

/// Matches the fingerprint table against headers, the meta generator, script
/// sources and the raw HTML. One entry per technology, in table order.
pub fn detect_technologies(fetched: &FetchedPage, page: &ParsedPage) -> Vec<DetectedTechnology> {
    COMPILED
        .iter()
        .filter_map(|compiled| {
            let header_hit = compiled.headers.iter().find_map(|(name, regex)| {
                find_version(regex, fetched.header_values(name).iter().map(String::as_str))
            });

            let hit = header_hit
                .map(|version| (TechnologySource::Header, version))
                .or_else(|| {
                    let regex = compiled.meta_generator.as_ref()?;
                    find_version(regex, page.meta_generator.as_deref())
                        .map(|version| (TechnologySource::MetaGenerator, version))
                })
                .or_else(|| {
                    let regex = compiled.script_src.as_ref()?;
                    find_version(regex, page.scripts.iter().map(|s| s.src.as_str()))
                        .map(|version| (TechnologySource::ScriptSrc, version))
                })
                .or_else(|| {
                    let regex = compiled.html.as_ref()?;
                    find_version(regex, std::iter::once(fetched.body.as_str()))
                        .map(|version| (TechnologySource::Html, version))
                });

            hit.map(|(source, version)| DetectedTechnology {
                name: compiled.fingerprint.name.to_string(),
                category: compiled.fingerprint.category.to_string(),
                source,
                version,
            })
        })
        .collect()
}
