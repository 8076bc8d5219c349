//! API configuration parsed from environment variables.

use crate::error::ErrorCode;
use crate::label::DEFAULT_MAX_LABEL_LENGTH;

pub const DEFAULT_API_BASE_URL: &str = "https://api.linode.com/v4beta";
pub const DEFAULT_TOKEN_ENV: &str = "LINODE_TOKEN";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Largest page the API will serve; list calls ask for as much as possible.
pub const API_MAX_PAGE_SIZE: u32 = 500;
pub const API_MIN_PAGE_SIZE: u32 = 25;

pub const MIN_LABEL_LENGTH: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API token: env var {var} not set")]
    MissingToken { var: String },

    #[error("config parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken { .. } => "E_MISSING_TOKEN",
            Self::Parse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub page_size: u32,
    pub timeouts: ApiTimeouts,
    /// Preferred template slug; `None` means "first template returned".
    pub template_slug: Option<String>,
    pub max_label_length: usize,
}

impl ApiConfig {
    /// Build typed API config from environment variables.
    ///
    /// Optional:
    /// - `FWGEN_API_BASE_URL`: default `https://api.linode.com/v4beta`
    /// - `FWGEN_API_TOKEN_ENV`: names the env var holding the token (default `LINODE_TOKEN`)
    /// - `FWGEN_PAGE_SIZE`: 25..=500, default 500
    /// - `FWGEN_REQUEST_TIMEOUT_SECS`: positive, default 30
    /// - `FWGEN_CONNECT_TIMEOUT_SECS`: positive, default 10
    /// - `FWGEN_TEMPLATE_SLUG`: preferred template slug
    /// - `FWGEN_MAX_LABEL_LENGTH`: 3..=32, default 32
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing or a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_var = std::env::var("FWGEN_API_TOKEN_ENV").unwrap_or_else(|_| DEFAULT_TOKEN_ENV.to_string());
        let token = std::env::var(&token_var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken { var: token_var })?;

        let base_url = std::env::var("FWGEN_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let page_size = parse_page_size(std::env::var("FWGEN_PAGE_SIZE").ok().as_deref())?;
        let timeouts = ApiTimeouts {
            request_secs: parse_timeout_secs(
                "FWGEN_REQUEST_TIMEOUT_SECS",
                std::env::var("FWGEN_REQUEST_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_timeout_secs(
                "FWGEN_CONNECT_TIMEOUT_SECS",
                std::env::var("FWGEN_CONNECT_TIMEOUT_SECS").ok().as_deref(),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };
        let template_slug = std::env::var("FWGEN_TEMPLATE_SLUG")
            .ok()
            .filter(|s| !s.is_empty());
        let max_label_length = parse_max_label_length(std::env::var("FWGEN_MAX_LABEL_LENGTH").ok().as_deref())?;

        Ok(Self { base_url, token, page_size, timeouts, template_slug, max_label_length })
    }
}

fn parse_page_size(raw: Option<&str>) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(API_MAX_PAGE_SIZE);
    };
    match raw.parse::<u32>() {
        Ok(size) if (API_MIN_PAGE_SIZE..=API_MAX_PAGE_SIZE).contains(&size) => Ok(size),
        _ => Err(ConfigError::Parse(format!(
            "FWGEN_PAGE_SIZE must be between {API_MIN_PAGE_SIZE} and {API_MAX_PAGE_SIZE}, got '{raw}'"
        ))),
    }
}

/// Labels may be shortened below the API limit, never raised above it.
/// Three characters is the smallest that fits `x-1`.
fn parse_max_label_length(raw: Option<&str>) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_LABEL_LENGTH);
    };
    match raw.parse::<usize>() {
        Ok(len) if (MIN_LABEL_LENGTH..=DEFAULT_MAX_LABEL_LENGTH).contains(&len) => Ok(len),
        _ => Err(ConfigError::Parse(format!(
            "FWGEN_MAX_LABEL_LENGTH must be between {MIN_LABEL_LENGTH} and {DEFAULT_MAX_LABEL_LENGTH}, got '{raw}'"
        ))),
    }
}

fn parse_timeout_secs(key: &str, raw: Option<&str>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::Parse(format!("{key} must be a positive number of seconds, got '{raw}'"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
