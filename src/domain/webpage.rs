use std::{collections::HashMap, time::Duration};

use url::Url;

use super::html_tag::{Form, Heading, Image, Link, Script};

/// Raw HTTP response for a page, with lowercase header names.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: Url,
    pub status: u16,
    pub headers: HashMap<String, Vec<String>>,
    pub body: String,
    pub elapsed: Duration,
}

impl FetchedPage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_https(&self) -> bool {
        self.final_url.scheme() == "https"
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Vec<String>,
    pub meta_robots: Option<String>,
    pub meta_generator: Option<String>,
    pub has_viewport: bool,
    pub canonical: Option<String>,
    pub language: Option<String>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub scripts: Vec<Script>,
    pub inline_scripts: usize,
    pub stylesheets: Vec<String>,
    pub forms: Vec<Form>,
    pub text: String,
    pub paragraphs: usize,
    pub html_length: usize,
}

impl ParsedPage {
    pub fn internal_links(&self) -> usize {
        self.links.iter().filter(|l| l.internal).count()
    }

    pub fn external_links(&self) -> usize {
        self.links.len() - self.internal_links()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn headings_at(&self, level: u8) -> usize {
        self.headings.iter().filter(|h| h.level == level).count()
    }
}
