//! Search backend trait

use super::models::UploadedFile;
use crate::error::FetchError;
use crate::results::ResultPayload;
use async_trait::async_trait;

/// Issues the two remote search operations the results page needs.
///
/// The orchestrator only talks to the backend through this trait, so tests
/// can script responses and their arrival order.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Full-text search for one page of results
    async fn search(&self, query: &str, page: u32, limit: u32)
        -> Result<ResultPayload, FetchError>;

    /// Similar-image search for an uploaded file
    async fn search_images(
        &self,
        file: &UploadedFile,
        limit: u32,
    ) -> Result<ResultPayload, FetchError>;
}
