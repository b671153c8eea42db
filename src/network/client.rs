//! HTTP client for the Falcony search API

use crate::config::BackendSettings;
use crate::error::FetchError;
use crate::results::ResultPayload;
use crate::search::{SearchBackend, UploadedFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper bound to one search API base URL
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    extra_headers: HashMap<String, String>,
    user_agent: String,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&BackendSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &BackendSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(settings.pool_maxsize)
            .gzip(true)
            .brotli(true);

        if let Some(timeout) = settings.request_timeout {
            let timeout = Duration::try_from_secs_f64(timeout)
                .with_context(|| format!("invalid request_timeout: {}", timeout))?;
            builder = builder.timeout(timeout);
        }

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            extra_headers: settings.extra_headers.clone(),
            user_agent: format!("falcony/{}", crate::VERSION),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn with_headers(&self, mut req_builder: RequestBuilder) -> RequestBuilder {
        req_builder = req_builder
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json");

        for (key, value) in &self.extra_headers {
            req_builder = req_builder.header(key, value);
        }
        req_builder
    }

    /// Check status and decode the `{ total, docs }` body
    async fn parse_response(response: Response) -> Result<ResultPayload, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let payload: ResultPayload = serde_json::from_str(&text)?;
        Ok(payload)
    }
}

#[async_trait]
impl SearchBackend for HttpClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<ResultPayload, FetchError> {
        let url = self.endpoint("search");
        debug!("GET {} query={:?} page={} limit={}", url, query, page, limit);

        let req_builder = self.with_headers(self.client.get(&url)).query(&[
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ]);

        let response = req_builder.send().await?;
        Self::parse_response(response).await
    }

    async fn search_images(
        &self,
        file: &UploadedFile,
        limit: u32,
    ) -> Result<ResultPayload, FetchError> {
        let url = self.endpoint("search_images");
        debug!("POST {} file={:?} limit={}", url, file, limit);

        let mut part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(ref content_type) = file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("limit", limit.to_string());

        let response = self
            .with_headers(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}
