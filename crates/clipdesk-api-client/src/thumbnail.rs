//! Thumbnail resolution for asset previews.

use crate::error::ApiError;
use crate::ApiClient;
use async_trait::async_trait;
use clipdesk_core::display::PLACEHOLDER_THUMBNAIL;

/// The two host calls thumbnail resolution needs.
#[async_trait]
pub trait ThumbnailBackend: Send + Sync {
    /// Obtain a thumbnail token for a signed playback id.
    async fn sign(&self, playback_id: &str) -> Result<String, ApiError>;

    /// Fetch the thumbnail as an image source (data URL).
    async fn thumbnail(&self, playback_id: &str, token: Option<&str>) -> Result<String, ApiError>;
}

#[async_trait]
impl ThumbnailBackend for ApiClient {
    async fn sign(&self, playback_id: &str) -> Result<String, ApiError> {
        self.sign_playback(playback_id).await
    }

    async fn thumbnail(&self, playback_id: &str, token: Option<&str>) -> Result<String, ApiError> {
        self.fetch_thumbnail(playback_id, token).await
    }
}

/// Resolve the image source for an asset preview.
///
/// Without a playback id the placeholder is returned and no request is made. A
/// signed playback id is signed first and the token is passed to the image request.
pub async fn resolve_thumbnail<B>(
    backend: &B,
    playback_id: Option<&str>,
    signed: bool,
) -> Result<String, ApiError>
where
    B: ThumbnailBackend + ?Sized,
{
    let Some(playback_id) = playback_id.filter(|id| !id.is_empty()) else {
        return Ok(PLACEHOLDER_THUMBNAIL.to_string());
    };

    let token = if signed {
        Some(backend.sign(playback_id).await?)
    } else {
        None
    };

    backend.thumbnail(playback_id, token.as_deref()).await
}
