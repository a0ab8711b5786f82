use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Where the video bytes come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[default]
    #[serde(rename = "file")]
    File,
    #[serde(rename = "url")]
    RemoteUrl,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::RemoteUrl => write!(f, "url"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingTier {
    #[default]
    Baseline,
    Smart,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mp4Support {
    #[default]
    None,
    Standard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxResolutionTier {
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
}

impl Display for MaxResolutionTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MaxResolutionTier::P1080 => write!(f, "1080p"),
            MaxResolutionTier::P1440 => write!(f, "1440p"),
            MaxResolutionTier::P2160 => write!(f, "2160p"),
        }
    }
}

impl std::str::FromStr for MaxResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1080p" => Ok(MaxResolutionTier::P1080),
            "1440p" => Ok(MaxResolutionTier::P1440),
            "2160p" => Ok(MaxResolutionTier::P2160),
            other => Err(format!(
                "Invalid resolution tier: {}. Must be one of: 1080p, 1440p, 2160p",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    #[default]
    None,
    Autogenerated,
    Uploaded,
}

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

impl FileHandle {
    /// Stat `path` and build a handle for it. The content type defaults to
    /// `application/octet-stream` and can be refined with [`FileHandle::with_content_type`].
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            content_type: "application/octet-stream".to_string(),
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// A text track as edited in a form: either a stored track or a new one with a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTrackDraft {
    pub language_code: String,
    pub name: String,
    pub closed_captions: bool,
    /// Provider status of a stored track ("ready", "preparing", ...)
    pub status: Option<String>,
    /// Provider id of the track this draft was loaded from
    pub stored_track_id: Option<String>,
    pub file: Option<FileHandle>,
}

/// Text track file embedded in a JSON request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFile {
    pub contents: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub name: String,
    pub size: u64,
}

/// Raw values of the new-upload form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub title: String,
    pub upload_type: SourceKind,
    pub file: Option<FileHandle>,
    pub url: String,
    pub signed: bool,
    pub encoding_tier: EncodingTier,
    pub mp4_support: Mp4Support,
    pub max_resolution_tier: MaxResolutionTier,
    pub text_tracks_type: CaptionMode,
    pub autogenerated_languages: BTreeSet<String>,
    pub custom_text_tracks: Vec<TextTrackDraft>,
}

/// Upload payload. Exactly one form is present and it matches the source kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    File(FileHandle),
    RemoteUrl(String),
}

impl UploadSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            UploadSource::File(_) => SourceKind::File,
            UploadSource::RemoteUrl(_) => SourceKind::RemoteUrl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Baseline,
    Smart {
        mp4_support: Mp4Support,
        max_resolution_tier: MaxResolutionTier,
    },
}

impl Encoding {
    pub fn tier(&self) -> EncodingTier {
        match self {
            Encoding::Baseline => EncodingTier::Baseline,
            Encoding::Smart { .. } => EncodingTier::Smart,
        }
    }
}

/// A custom caption track that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTrack {
    pub language_code: String,
    pub name: String,
    pub closed_captions: bool,
    pub file: FileHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captions {
    None,
    Autogenerated(BTreeSet<String>),
    Uploaded(Vec<CustomTrack>),
}

impl Captions {
    pub fn mode(&self) -> CaptionMode {
        match self {
            Captions::None => CaptionMode::None,
            Captions::Autogenerated(_) => CaptionMode::Autogenerated,
            Captions::Uploaded(_) => CaptionMode::Uploaded,
        }
    }
}

/// A validated upload request. Built from an [`UploadForm`] by
/// [`crate::validation::validate_upload_form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub title: String,
    pub source: UploadSource,
    pub signed_playback: bool,
    pub encoding: Encoding,
    pub captions: Captions,
}

impl UploadRequest {
    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }
}
