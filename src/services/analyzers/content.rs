use crate::domain::{ContentReport, ParsedPage};

pub fn analyze_content(page: &ParsedPage) -> ContentReport {
    let word_count = page.word_count();
    let avg_words_per_paragraph = if page.paragraphs == 0 {
        0.0
    } else {
        round2(word_count as f64 / page.paragraphs as f64)
    };
    let text_to_html_ratio = if page.html_length == 0 {
        0.0
    } else {
        round2(page.text.len() as f64 / page.html_length as f64 * 100.0)
    };

    ContentReport {
        word_count,
        paragraph_count: page.paragraphs,
        avg_words_per_paragraph,
        text_to_html_ratio,
        heading_outline: page.headings.clone(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::{domain::html_tag::Heading, services::parser::parse_page};

    #[test]
    fn measures_text_and_outline() {
        let html = "<html><body><h1>Guide</h1><p>one two three</p><h2>Part</h2><p>four five six seven</p></body></html>";
        let page = parse_page(html, &Url::parse("https://example.com/").unwrap());
        let report = analyze_content(&page);

        assert_eq!(report.paragraph_count, 2);
        assert_eq!(report.word_count, 9);
        assert_eq!(report.avg_words_per_paragraph, 4.5);
        assert!(report.text_to_html_ratio > 0.0 && report.text_to_html_ratio < 100.0);
        assert_eq!(
            report.heading_outline,
            vec![
                Heading { level: 1, text: "Guide".to_string() },
                Heading { level: 2, text: "Part".to_string() },
            ]
        );
    }

    #[test]
    fn empty_page_has_zero_ratios() {
        let report = analyze_content(&ParsedPage::default());

        assert_eq!(report.word_count, 0);
        assert_eq!(report.avg_words_per_paragraph, 0.0);
        assert_eq!(report.text_to_html_ratio, 0.0);
    }
}
