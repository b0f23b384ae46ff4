use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub internal: bool,
    pub nofollow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
}

impl Image {
    pub fn has_alt(&self) -> bool {
        self.alt.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub src: String,
    pub has_integrity: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub method: String,
    /// Resolved action URL, the page URL itself when the attribute is missing.
    pub action: String,
    pub has_password_field: bool,
}
