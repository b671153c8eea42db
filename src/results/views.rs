//! Sibling views rendered next to the result list: image grid and pagination

use super::types::{Document, ResultPayload, SearchStatus};
use serde::Serialize;

/// Widest run of page links shown at once
pub const PAGINATION_WINDOW: u64 = 10;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Image search hits laid out as a grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageResultsView {
    pub images: Vec<ImageView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub key: usize,
    pub image_url: String,
    pub page_url: Option<String>,
    pub title: Option<String>,
}

/// Build the image grid, or `None` unless the images view is active.
///
/// Documents without a usable image location are skipped; keys keep the
/// document's position in `docs`.
pub fn format_image_results(
    results: Option<&ResultPayload>,
    status: &SearchStatus,
) -> Option<ImageResultsView> {
    if *status != SearchStatus::Images {
        return None;
    }

    let docs = results.map(|r| r.docs.as_slice()).unwrap_or_default();
    let images = docs
        .iter()
        .enumerate()
        .filter_map(|(key, doc)| {
            image_location(doc).map(|image_url| ImageView {
                key,
                image_url: image_url.to_string(),
                page_url: doc.url.clone(),
                title: doc.title.clone(),
            })
        })
        .collect();

    Some(ImageResultsView { images })
}

fn image_location(doc: &Document) -> Option<&str> {
    if let Some(src) = doc.image_url.as_deref().filter(|s| !s.is_empty()) {
        return Some(src);
    }
    doc.url.as_deref().filter(|url| {
        let lower = url.to_ascii_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    })
}

/// Page navigation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub page: u64,
    pub total_pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    /// Page numbers to link, centered on the current page where possible
    pub pages: Vec<u64>,
}

impl PaginationView {
    pub fn new(page: u32, total_pages: u64) -> Self {
        let page = u64::from(page.max(1));

        let pages = if total_pages == 0 {
            vec![]
        } else {
            let half = PAGINATION_WINDOW / 2;
            let end = (page.saturating_sub(half) + PAGINATION_WINDOW - 1)
                .max(PAGINATION_WINDOW)
                .min(total_pages);
            let start = end.saturating_sub(PAGINATION_WINDOW - 1).max(1);
            (start..=end).collect()
        };

        Self {
            page,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
            pages,
        }
    }
}
