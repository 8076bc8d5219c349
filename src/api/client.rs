//! REST client for the firewall endpoints.
//!
//! Thin HTTP wrapper over `/networking/firewalls`. List calls walk every
//! page; a preferred template is read from its own endpoint instead.
//! Response parsing lives in pure functions for testability.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::config::{ApiConfig, ConfigError};
use super::types::{ApiError, ApiErrorBody, CreateFirewallPayload, Firewall, FirewallTemplate, Page};
use super::{ExistingResourceSource, ResourceCreator, TemplateSource};

const FIREWALLS_PATH: &str = "/networking/firewalls";
const TEMPLATES_PATH: &str = "/networking/firewalls/templates";

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl ApiClient {
    /// Build a client from parsed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), token: config.token.clone(), page_size: config.page_size })
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &str, page: u32) -> Result<Page<T>, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("page", page), ("page_size", self.page_size)])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        parse_body(status, &text)
    }

    /// Fetch every page of a list endpoint and concatenate the items.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let current: Page<T> = self.get_page(path, page).await?;
            debug!(path, page, pages = current.pages, count = current.data.len(), "api: page fetched");
            items.extend(current.data);
            match next_page(page, current.pages) {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(items)
    }
}

#[async_trait::async_trait]
impl TemplateSource for ApiClient {
    async fn fetch_templates(&self) -> Result<Vec<FirewallTemplate>, ApiError> {
        self.get_all(TEMPLATES_PATH).await
    }

    async fn fetch_template(&self, slug: &str) -> Result<Option<FirewallTemplate>, ApiError> {
        let url = template_url(&self.base_url, slug)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!(slug, status = status.as_u16(), "api: template looked up");
        parse_optional_body(status, &text)
    }
}

#[async_trait::async_trait]
impl ExistingResourceSource for ApiClient {
    async fn fetch_existing(&self) -> Result<Vec<Firewall>, ApiError> {
        self.get_all(FIREWALLS_PATH).await
    }
}

#[async_trait::async_trait]
impl ResourceCreator for ApiClient {
    async fn create(&self, payload: &CreateFirewallPayload) -> Result<Firewall, ApiError> {
        let url = format!("{}{FIREWALLS_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        parse_body(status, &text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode a success body, or turn a failure body into an [`ApiError`].
fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(error_from_body(status, text));
    }
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Like [`parse_body`], but a 404 means "no such resource" rather than failure.
fn parse_optional_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<Option<T>, ApiError> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    parse_body(status, text).map(Some)
}

/// `{base}/networking/firewalls/templates/{slug}` with the slug escaped as
/// a single path segment.
fn template_url(base_url: &str, slug: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(&format!("{base_url}{TEMPLATES_PATH}"))
        .map_err(|e| ApiError::Network(format!("invalid API URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::Network(format!("invalid API URL: {base_url}")))?
        .push(slug);
    Ok(url)
}

/// The first `reason` of an `{"errors": [...]}` body becomes the message.
fn error_from_body(status: StatusCode, text: &str) -> ApiError {
    let reason = serde_json::from_str::<ApiErrorBody>(text)
        .ok()
        .and_then(|body| body.errors.into_iter().next())
        .map(|e| e.reason);

    let message = reason.unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    ApiError::Api { status: status.as_u16(), message }
}

/// Next page to request, or `None` once the last page has been read.
fn next_page(current: u32, pages: u32) -> Option<u32> {
    (current < pages).then_some(current + 1)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
