//! Domain methods for the plugin API client.
//!
//! Request bodies (submit, update, delete) are defined here; response types come
//! from `clipdesk_core::models`.

use crate::error::{field_errors_from, ApiError};
use crate::ApiClient;
use base64::Engine;
use clipdesk_core::models::{
    Asset, AssetListResponse, CaptionMode, Captions, Encoding, EncodingTier, FileHandle,
    ListAssetsQuery, MaxResolutionTier, Mp4Support, SourceKind, TextTrackDraft, TrackFile,
    UploadRequest, UploadSource,
};
use clipdesk_core::validation::AssetChanges;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of registering an upload with the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// File uploads: the provider endpoint the bytes must be sent to
    UploadTarget { url: String },
    /// Remote URLs: the provider pulls the video itself
    Accepted { asset: Option<Box<Asset>> },
}

/// Body of `POST /uploads`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitUploadBody {
    pub title: String,
    pub upload_type: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub signed: bool,
    pub encoding_tier: EncodingTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp4_support: Option<Mp4Support>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resolution_tier: Option<MaxResolutionTier>,
    pub text_tracks_type: CaptionMode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub autogenerated_captions_languages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_text_tracks: Vec<TrackBody>,
}

/// A caption track as sent to the host. New tracks embed their file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackBody {
    pub language_code: String,
    pub name: String,
    pub closed_captions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<TrackFile>,
}

/// Body of `PUT /mux-asset/{id}`. Only changed fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateAssetBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_text_tracks: Option<Vec<TrackBody>>,
}

#[derive(Debug, Serialize)]
struct DeleteAssetBody<'a> {
    id: u64,
    asset_id: Option<&'a str>,
    upload_id: Option<&'a str>,
    delete_on_mux: bool,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    token: String,
}

/// Read a caption file so it can be embedded in a JSON body.
pub async fn read_track_file(handle: &FileHandle) -> Result<TrackFile, ApiError> {
    let contents = tokio::fs::read_to_string(&handle.path).await?;
    Ok(TrackFile {
        size: contents.len() as u64,
        contents,
        content_type: handle.content_type.clone(),
        name: handle.name.clone(),
    })
}

async fn track_body(draft: &TextTrackDraft) -> Result<TrackBody, ApiError> {
    let file = match &draft.file {
        Some(handle) => Some(read_track_file(handle).await?),
        None => None,
    };
    Ok(TrackBody {
        language_code: draft.language_code.clone(),
        name: draft.name.clone(),
        closed_captions: draft.closed_captions,
        stored_track_id: draft.stored_track_id.clone(),
        file,
    })
}

impl SubmitUploadBody {
    /// Build the JSON body, reading any custom caption files from disk.
    pub async fn from_request(request: &UploadRequest) -> Result<Self, ApiError> {
        let url = match &request.source {
            UploadSource::RemoteUrl(url) => Some(url.clone()),
            UploadSource::File(_) => None,
        };
        let (mp4_support, max_resolution_tier) = match request.encoding {
            Encoding::Baseline => (None, None),
            Encoding::Smart {
                mp4_support,
                max_resolution_tier,
            } => (Some(mp4_support), Some(max_resolution_tier)),
        };

        let mut autogenerated_captions_languages = Vec::new();
        let mut custom_text_tracks = Vec::new();
        match &request.captions {
            Captions::None => {}
            Captions::Autogenerated(languages) => {
                autogenerated_captions_languages = languages.iter().cloned().collect();
            }
            Captions::Uploaded(tracks) => {
                for track in tracks {
                    custom_text_tracks.push(TrackBody {
                        language_code: track.language_code.clone(),
                        name: track.name.clone(),
                        closed_captions: track.closed_captions,
                        stored_track_id: None,
                        file: Some(read_track_file(&track.file).await?),
                    });
                }
            }
        }

        Ok(Self {
            title: request.title.clone(),
            upload_type: request.source_kind(),
            url,
            signed: request.signed_playback,
            encoding_tier: request.encoding.tier(),
            mp4_support,
            max_resolution_tier,
            text_tracks_type: request.captions.mode(),
            autogenerated_captions_languages,
            custom_text_tracks,
        })
    }
}

impl UpdateAssetBody {
    pub async fn from_changes(changes: &AssetChanges) -> Result<Self, ApiError> {
        let custom_text_tracks = match &changes.custom_text_tracks {
            Some(drafts) => {
                let mut tracks = Vec::with_capacity(drafts.len());
                for draft in drafts {
                    tracks.push(track_body(draft).await?);
                }
                Some(tracks)
            }
            None => None,
        };
        Ok(Self {
            title: changes.title.clone(),
            custom_text_tracks,
        })
    }
}

/// Interpret the body returned by `POST /uploads`.
fn interpret_submit_response(kind: SourceKind, value: Value) -> Result<SubmitOutcome, ApiError> {
    let status_code = value.get("statusCode").and_then(Value::as_u64);
    if let Some(code) = status_code.filter(|c| *c != 200) {
        let errors = value
            .get("data")
            .and_then(|d| d.get("errors"))
            .unwrap_or(&Value::Null);
        tracing::debug!(status_code = code, "Upload rejected by host validation");
        return Err(ApiError::Rejected(field_errors_from(errors)));
    }

    match kind {
        SourceKind::File => value
            .get("url")
            .and_then(Value::as_str)
            .map(|url| SubmitOutcome::UploadTarget {
                url: url.to_string(),
            })
            .ok_or_else(|| ApiError::Decode("Upload response did not include an upload url".into())),
        SourceKind::RemoteUrl => Ok(SubmitOutcome::Accepted {
            asset: serde_json::from_value::<Asset>(value).ok().map(Box::new),
        }),
    }
}

/// Encode an image body as a data URL.
pub fn image_data_url(content_type: &str, body: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(body)
    )
}

impl ApiClient {
    /// Register an upload with the host. File uploads get back the provider's
    /// upload target; remote URLs are accepted as-is.
    pub async fn submit_upload(&self, request: &UploadRequest) -> Result<SubmitOutcome, ApiError> {
        let body = SubmitUploadBody::from_request(request).await?;
        tracing::info!(
            upload_type = %body.upload_type,
            signed = body.signed,
            tracks = body.custom_text_tracks.len(),
            "Submitting upload"
        );
        let value: Value = self.post_json("/uploads", &body).await?;
        interpret_submit_response(request.source_kind(), value)
    }

    /// List assets with pagination, sort and optional search.
    pub async fn list_assets(&self, query: &ListAssetsQuery) -> Result<AssetListResponse, ApiError> {
        self.get("/mux-asset", &query.to_query_pairs()).await
    }

    pub async fn get_asset(&self, id: u64) -> Result<Asset, ApiError> {
        self.get(&format!("/mux-asset/{}", id), &[]).await
    }

    /// Send the changed fields of an asset. Nothing is sent when nothing changed;
    /// in that case `Ok(None)` is returned.
    pub async fn update_asset(&self, changes: &AssetChanges) -> Result<Option<Asset>, ApiError> {
        if changes.is_empty() {
            tracing::debug!(asset = changes.id, "No asset changes to send");
            return Ok(None);
        }
        let body = UpdateAssetBody::from_changes(changes).await?;
        let asset = self
            .put_json(&format!("/mux-asset/{}", changes.id), &body)
            .await?;
        tracing::info!(asset = changes.id, "Asset updated");
        Ok(Some(asset))
    }

    /// Delete an asset from the host and from the provider.
    pub async fn delete_asset(&self, asset: &Asset) -> Result<(), ApiError> {
        let body = DeleteAssetBody {
            id: asset.id,
            asset_id: asset.asset_id.as_deref(),
            upload_id: asset.upload_id.as_deref(),
            delete_on_mux: true,
        };
        self.delete_json("/deleteMuxAsset", &body).await?;
        tracing::info!(asset = asset.id, "Asset deleted");
        Ok(())
    }

    /// Request a thumbnail token for a signed playback id.
    pub async fn sign_playback(&self, playback_id: &str) -> Result<String, ApiError> {
        let response: SignResponse = self
            .get(
                &format!("/sign/{}", urlencoding::encode(playback_id)),
                &[("type", "thumbnail".to_string())],
            )
            .await?;
        Ok(response.token)
    }

    /// Fetch a thumbnail and return it as an image source: the host's data URL as
    /// sent, or raw image bytes encoded as one.
    pub async fn fetch_thumbnail(
        &self,
        playback_id: &str,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        let query: Vec<(&str, String)> = token
            .map(|t| vec![("token", t.to_string())])
            .unwrap_or_default();
        let (content_type, body) = self
            .get_bytes(
                &format!("/thumbnail/{}", urlencoding::encode(playback_id)),
                &query,
            )
            .await?;

        if let Some(image_type) = content_type
            .as_deref()
            .filter(|t| t.starts_with("image/"))
        {
            let mime = image_type.split(';').next().unwrap_or(image_type).trim();
            return Ok(image_data_url(mime, &body));
        }

        let text = String::from_utf8_lossy(&body);
        let source = match serde_json::from_str::<Value>(&text) {
            Ok(Value::String(s)) => s,
            _ => text.trim().to_string(),
        };
        if source.is_empty() {
            return Err(ApiError::Decode("Thumbnail response was empty".into()));
        }
        Ok(source)
    }
}
