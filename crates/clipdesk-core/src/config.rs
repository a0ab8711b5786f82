//! Configuration module
//!
//! Client configuration is read from `CLIPDESK_*` environment variables. Unset or
//! unparsable optional values fall back to the defaults below; the API token is the
//! only required value.

use std::env;

// Common constants
const DEFAULT_API_URL: &str = "http://localhost:1337";
const DEFAULT_PLUGIN_PATH: &str = "/mux-video-uploader";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const CHUNK_SIZE_KB: u64 = 30720;
const CHUNK_ATTEMPTS: u32 = 5;
const CHUNK_RETRY_DELAY_MS: u64 = 1000;

/// Chunk sizes must be a multiple of this many KiB.
pub const CHUNK_SIZE_GRANULARITY_KB: u64 = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the host CMS (scheme + authority, no trailing slash)
    pub api_url: String,
    pub api_token: String,
    /// Namespace the plugin routes are mounted under
    pub plugin_path: String,
    pub request_timeout_secs: u64,
    pub chunk_size_kb: u64,
    /// Attempts per chunk before the transfer gives up
    pub chunk_attempts: u32,
    pub chunk_retry_delay_ms: u64,
}

impl ClientConfig {
    /// Configuration with defaults for everything except the endpoint and token.
    pub fn new(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
            plugin_path: DEFAULT_PLUGIN_PATH.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            chunk_size_kb: CHUNK_SIZE_KB,
            chunk_attempts: CHUNK_ATTEMPTS,
            chunk_retry_delay_ms: CHUNK_RETRY_DELAY_MS,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("CLIPDESK_API_TOKEN")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Missing API token. Set CLIPDESK_API_TOKEN"))?;

        let config = ClientConfig {
            api_url: lookup("CLIPDESK_API_URL")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_token,
            plugin_path: normalize_plugin_path(
                &lookup("CLIPDESK_PLUGIN_PATH").unwrap_or_else(|| DEFAULT_PLUGIN_PATH.to_string()),
            ),
            request_timeout_secs: parse_or_default(
                &lookup,
                "CLIPDESK_REQUEST_TIMEOUT_SECS",
                REQUEST_TIMEOUT_SECS,
            ),
            chunk_size_kb: parse_or_default(&lookup, "CLIPDESK_CHUNK_SIZE_KB", CHUNK_SIZE_KB),
            chunk_attempts: parse_or_default(&lookup, "CLIPDESK_CHUNK_ATTEMPTS", CHUNK_ATTEMPTS),
            chunk_retry_delay_ms: parse_or_default(
                &lookup,
                "CLIPDESK_CHUNK_RETRY_DELAY_MS",
                CHUNK_RETRY_DELAY_MS,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.api_token.trim().is_empty() {
            return Err(anyhow::anyhow!("CLIPDESK_API_TOKEN must not be empty"));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "CLIPDESK_API_URL must be an http:// or https:// URL"
            ));
        }

        if self.chunk_size_kb == 0 || self.chunk_size_kb % CHUNK_SIZE_GRANULARITY_KB != 0 {
            return Err(anyhow::anyhow!(
                "CLIPDESK_CHUNK_SIZE_KB must be a positive multiple of {}",
                CHUNK_SIZE_GRANULARITY_KB
            ));
        }

        if self.chunk_attempts == 0 {
            return Err(anyhow::anyhow!("CLIPDESK_CHUNK_ATTEMPTS must be at least 1"));
        }

        Ok(())
    }

    /// Chunk size in bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_kb * 1024
    }

    /// Full URL for a plugin route, e.g. `/sign/abc` -> `{api_url}{plugin_path}/sign/abc`.
    pub fn plugin_url(&self, path: &str) -> String {
        format!("{}{}{}", self.api_url, self.plugin_path, path)
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn normalize_plugin_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
