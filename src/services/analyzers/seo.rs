use crate::domain::{ParsedPage, SeoIssue, SeoReport};

const TITLE_LENGTH: std::ops::RangeInclusive<usize> = 10..=60;
const DESCRIPTION_LENGTH: std::ops::RangeInclusive<usize> = 50..=160;
const MAX_ALT_PENALTY: u8 = 10;

/// Scores on-page SEO basics starting from 100 and subtracting a penalty per issue.
pub fn analyze_seo(page: &ParsedPage, is_https: bool) -> SeoReport {
    let mut issues = Vec::new();
    let mut issue = |check: &str, message: String, penalty: u8| {
        issues.push(SeoIssue {
            check: check.to_string(),
            message,
            penalty,
        })
    };

    match &page.title {
        None => issue("title", "Page has no <title>".to_string(), 20),
        Some(title) if !TITLE_LENGTH.contains(&title.chars().count()) => issue(
            "title_length",
            format!(
                "Title is {} characters, recommended {}-{}",
                title.chars().count(),
                TITLE_LENGTH.start(),
                TITLE_LENGTH.end()
            ),
            5,
        ),
        Some(_) => {}
    }

    match &page.meta_description {
        None => issue(
            "meta_description",
            "Page has no meta description".to_string(),
            15,
        ),
        Some(description) if !DESCRIPTION_LENGTH.contains(&description.chars().count()) => issue(
            "meta_description_length",
            format!(
                "Meta description is {} characters, recommended {}-{}",
                description.chars().count(),
                DESCRIPTION_LENGTH.start(),
                DESCRIPTION_LENGTH.end()
            ),
            5,
        ),
        Some(_) => {}
    }

    match page.headings_at(1) {
        0 => issue("h1", "Page has no <h1> heading".to_string(), 10),
        1 => {}
        n => issue("h1_multiple", format!("Page has {} <h1> headings", n), 5),
    }

    let missing_alt = page.images.iter().filter(|i| !i.has_alt()).count();
    if missing_alt > 0 {
        let penalty = u8::try_from(missing_alt * 2)
            .unwrap_or(MAX_ALT_PENALTY)
            .min(MAX_ALT_PENALTY);
        issue(
            "image_alt",
            format!("{} image(s) have no alt attribute", missing_alt),
            penalty,
        );
    }

    if page.canonical.is_none() {
        issue("canonical", "No canonical link".to_string(), 5);
    }
    if page.language.is_none() {
        issue("lang", "<html> has no lang attribute".to_string(), 5);
    }
    if !page.has_viewport {
        issue("viewport", "No viewport meta tag".to_string(), 10);
    }
    if !is_https {
        issue("https", "Page is not served over HTTPS".to_string(), 10);
    }
    if page
        .meta_robots
        .as_deref()
        .is_some_and(|robots| robots.contains("noindex"))
    {
        issue("noindex", "Robots meta tag blocks indexing".to_string(), 10);
    }

    let penalty: u32 = issues.iter().map(|i| u32::from(i.penalty)).sum();
    let score = 100u32.saturating_sub(penalty) as u8;

    SeoReport {
        score,
        grade: grade(score),
        issues,
    }
}

fn grade(score: u8) -> char {
    match score {
        90.. => 'A',
        80..=89 => 'B',
        70..=79 => 'C',
        60..=69 => 'D',
        _ => 'F',
    }
}
