//! Falcony: results page client for the Falcony search engine
//!
//! Drives text search and similar-image search against the Falcony API,
//! tracks loading and timing, and publishes a display state that the
//! result list, image grid and pagination views render from.

pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod query;
pub mod results;
pub mod search;

pub use config::Settings;
pub use error::FetchError;
pub use network::HttpClient;
pub use results::{ResultPayload, SearchStatus};
pub use search::{DisplayState, Orchestrator, SearchBackend, SearchQuery};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Results per page requested from the backend
pub const DEFAULT_PAGE_SIZE: u32 = 10;
