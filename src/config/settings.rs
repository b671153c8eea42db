//! Settings structures for the Falcony results client

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main settings structure, mirrors `falcony.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub backend: BackendSettings,
    pub search: SearchSettings,
    pub ui: UiSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (FALCONY_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("FALCONY_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("FALCONY_BASE_URL") {
            self.backend.base_url = val;
        }
        if let Ok(val) = std::env::var("FALCONY_REQUEST_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.backend.request_timeout = Some(timeout);
            }
        }
        if let Ok(val) = std::env::var("FALCONY_PAGE_SIZE") {
            if let Ok(size) = val.parse() {
                self.search.page_size = size;
            }
        }
    }

    /// Reject settings the orchestrator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            anyhow::bail!("search.page_size must be greater than zero");
        }
        if self.backend.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if let Some(timeout) = self.backend.request_timeout {
            if !timeout.is_finite() || timeout <= 0.0 {
                anyhow::bail!("backend.request_timeout must be a positive number of seconds");
            }
            if Duration::try_from_secs_f64(timeout).is_err() {
                anyhow::bail!("backend.request_timeout {} is out of range", timeout);
            }
        }
        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name printed above results
    pub instance_name: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "Falcony".to_string(),
        }
    }
}

/// Search backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the search API (`/search` and `/search_images` live under it)
    pub base_url: String,
    /// Request timeout in seconds (none = wait indefinitely)
    pub request_timeout: Option<f64>,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: None,
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results per page; image search asks for twice as many
    pub page_size: u32,
    /// Drop responses from superseded fetches instead of letting the last arrival win
    pub discard_stale_responses: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: crate::DEFAULT_PAGE_SIZE,
            discard_stale_responses: true,
        }
    }
}

/// Terminal rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Maximum snippet length in characters
    pub snippet_length: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            snippet_length: 200,
        }
    }
}
