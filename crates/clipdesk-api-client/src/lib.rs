//! HTTP client for the clipdesk plugin API.
//!
//! Provides a client authenticated with a Bearer token, generic JSON helpers rooted
//! at the plugin namespace, and the domain methods used by the CLI: upload
//! submission, asset management and thumbnail resolution. The chunked transfer to
//! the provider's upload target and the session driver live in [`transfer`] and
//! [`session`].

pub mod api;
pub mod error;
pub mod session;
pub mod thumbnail;
pub mod transfer;

use anyhow::Context;
use bytes::Bytes;
use clipdesk_core::ClientConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub use api::{SubmitOutcome, UpdateAssetBody};
pub use error::{ApiError, StartError};
pub use session::{SessionHandle, Uploader};
pub use thumbnail::{resolve_thumbnail, ThumbnailBackend};
pub use transfer::{ChunkedTransfer, TransferOptions};

/// HTTP client for the plugin API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        config.validate().context("Invalid client configuration")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Create client from `CLIPDESK_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.api_url
    }

    /// Full URL of a plugin route.
    pub fn build_url(&self, path: &str) -> String {
        self.config.plugin_url(path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.config.api_token)
    }

    /// Send an authenticated request and fail on any non-success status, keeping the
    /// provider's message from the body.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.apply_auth(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error::provider_message(&body);
            tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "GET");
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// GET request returning the raw body with its content type.
    pub async fn get_bytes(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(Option<String>, Bytes), ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "GET");
        let mut request = self.client.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = self.send(request).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok((content_type, body))
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "POST");
        let response = self.send(self.client.post(&url).json(body)).await?;
        Self::decode(response).await
    }

    /// PUT JSON body and deserialize response.
    pub async fn put_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "PUT");
        let response = self.send(self.client.put(&url).json(body)).await?;
        Self::decode(response).await
    }

    /// DELETE request with a JSON body. Returns Ok(()) on success.
    pub async fn delete_json<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.build_url(path);
        tracing::debug!(url = %url, "DELETE");
        self.send(self.client.delete(&url).json(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_uses_plugin_namespace() {
        let client = ApiClient::new(ClientConfig::new("http://cms.local:1337/", "token")).unwrap();
        assert_eq!(client.base_url(), "http://cms.local:1337");
        assert_eq!(
            client.build_url("/mux-asset/4"),
            "http://cms.local:1337/mux-video-uploader/mux-asset/4"
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ClientConfig::new("http://cms.local", "token");
        config.chunk_size_kb = 100;
        assert!(ApiClient::new(config).is_err());
    }
}
