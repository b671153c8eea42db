//! Query parameter parsing module
//!
//! The results page reads its search from the URL:
//! `/results?query=<text>&page=<n>&status=<view>`. A missing or blank
//! `query` means no active search; a missing or invalid `page` means page 1.

use crate::results::SearchStatus;
use crate::search::SearchQuery;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Search inputs read from a results page URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub query: Option<String>,
    pub page: Option<u32>,
    /// Sidebar view to open with
    pub status: Option<SearchStatus>,
}

impl QueryParams {
    /// Parse a full URL, e.g. `http://localhost:5173/results?query=rust`
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid results URL: {}", raw))?;
        Ok(Self::from_pairs(url.query_pairs()))
    }

    /// Parse a bare query string, with or without the leading `?`
    pub fn from_query_string(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        Self::from_pairs(url::form_urlencoded::parse(raw.as_bytes()))
    }

    fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                // first occurrence wins
                "query" if params.query.is_none() => params.query = Some(value.into_owned()),
                "page" if params.page.is_none() => {
                    params.page = value.trim().parse().ok().filter(|p| *p > 0)
                }
                "status" if params.status.is_none() => {
                    params.status = Some(SearchStatus::from(value.into_owned()))
                }
                _ => {}
            }
        }
        params
    }

    /// Convert to the orchestrator's text search key
    pub fn to_search_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone(),
            page: self.page.unwrap_or(1),
        }
    }
}
