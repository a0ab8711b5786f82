use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::upload::TextTrackDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    #[serde(other)]
    Unknown,
}

/// A media track as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub text_type: Option<String>,
    pub status: Option<String>,
    pub language_code: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub closed_captions: bool,
}

impl Track {
    /// Subtitle text track that has not errored on the provider side.
    pub fn is_stored_subtitle(&self) -> bool {
        self.kind == TrackKind::Text
            && self.text_type.as_deref() == Some("subtitles")
            && self.status.as_deref() != Some("errored")
    }
}

/// Provider-side data cached on the asset record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetData {
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Asset record as stored by the host CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub title: Option<String>,
    pub upload_id: Option<String>,
    pub asset_id: Option<String>,
    pub playback_id: Option<String>,
    #[serde(default)]
    pub signed: bool,
    #[serde(rename = "isReady", default)]
    pub is_ready: bool,
    pub duration: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub error_message: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
    pub asset_data: Option<AssetData>,
}

impl Asset {
    /// The provider has not created the asset yet.
    pub fn is_processing(&self) -> bool {
        self.asset_id.is_none()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn effective_aspect_ratio(&self) -> Option<&str> {
        self.aspect_ratio
            .as_deref()
            .or_else(|| self.asset_data.as_ref()?.aspect_ratio.as_deref())
    }

    /// Title, falling back to the provider asset id and then the creation date.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| self.asset_id.clone())
            .or_else(|| self.created_at.map(|d| d.to_rfc3339()))
            .unwrap_or_default()
    }

    pub fn tracks(&self) -> &[Track] {
        self.asset_data
            .as_ref()
            .map(|d| d.tracks.as_slice())
            .unwrap_or_default()
    }

    pub fn subtitles(&self) -> impl Iterator<Item = &Track> {
        self.tracks().iter().filter(|t| t.is_stored_subtitle())
    }

    /// Stored subtitles as editable drafts, in provider order.
    pub fn subtitle_drafts(&self) -> Vec<TextTrackDraft> {
        self.subtitles()
            .map(|t| TextTrackDraft {
                language_code: t.language_code.clone().unwrap_or_default(),
                name: t.name.clone().unwrap_or_default(),
                closed_captions: t.closed_captions,
                status: t.status.clone(),
                stored_track_id: t.id.clone(),
                file: None,
            })
            .collect()
    }
}

/// Sort order for asset listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    TitleAsc,
    TitleDesc,
}

impl SortOrder {
    pub fn as_query(&self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "createdAt:desc",
            SortOrder::OldestFirst => "createdAt:asc",
            SortOrder::TitleAsc => "title:asc",
            SortOrder::TitleDesc => "title:desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" | "createdAt:desc" => Ok(SortOrder::NewestFirst),
            "oldest" | "createdAt:asc" => Ok(SortOrder::OldestFirst),
            "title" | "title:asc" => Ok(SortOrder::TitleAsc),
            "title-desc" | "title:desc" => Ok(SortOrder::TitleDesc),
            other => Err(format!(
                "Invalid sort order: {}. Must be one of: newest, oldest, title, title-desc",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    AssetId,
}

impl Display for SearchField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SearchField::Title => write!(f, "title"),
            SearchField::AssetId => write!(f, "asset_id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSearch {
    pub field: SearchField,
    pub value: String,
}

/// Pagination, sort and search parameters for listing assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListAssetsQuery {
    pub start: u32,
    pub limit: u32,
    pub sort: SortOrder,
    pub search: Option<AssetSearch>,
}

impl Default for ListAssetsQuery {
    fn default() -> Self {
        Self {
            start: 0,
            limit: 20,
            sort: SortOrder::default(),
            search: None,
        }
    }
}

impl ListAssetsQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("start", self.start.to_string()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.as_query().to_string()),
        ];
        if let Some(search) = self.search.as_ref().filter(|s| !s.value.is_empty()) {
            query.push(("field", search.field.to_string()));
            query.push(("value", search.value.clone()));
        }
        query
    }
}

/// Page of assets returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetListResponse {
    pub items: Vec<Asset>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}
