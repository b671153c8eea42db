//! Result type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of a `/search` or `/search_images` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Total number of matches across all pages
    #[serde(default)]
    pub total: Option<u64>,
    /// Items for the requested page, in ranking order
    #[serde(default)]
    pub docs: Vec<Document>,
}

impl ResultPayload {
    pub fn new(total: u64, docs: Vec<Document>) -> Self {
        Self {
            total: Some(total),
            docs,
        }
    }

    /// Number of pages needed to show `total` items at `page_size` per page
    pub fn total_pages(&self, page_size: u32) -> u64 {
        match (self.total, page_size) {
            (Some(total), size) if size > 0 => total.div_ceil(u64::from(size)),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// A single result item.
///
/// The backend owns the item shape; the fields below are the ones the views
/// read, anything else is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page text or snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Image location for image search hits
    #[serde(
        default,
        alias = "imageUrl",
        alias = "img_src",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Add content to the document
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Add an image URL to the document
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Which result view the page currently shows, driven by the sidebar filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchStatus {
    #[default]
    All,
    Images,
    /// Any other sidebar filter; no built-in view renders it
    Other(String),
}

impl SearchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Images => "images",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Self::All,
            "images" => Self::Images,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for SearchStatus {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<SearchStatus> for String {
    fn from(status: SearchStatus) -> Self {
        status.as_str().to_string()
    }
}
