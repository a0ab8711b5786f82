//! Form validation
//!
//! Validation runs before any network interaction. Failures are collected per field
//! into [`FieldErrors`] so a caller can show every problem at once.

use regex::Regex;
use std::sync::LazyLock;
use validator::{Validate, ValidationErrors};

use crate::error::FieldErrors;
use crate::models::{
    find_language, Asset, CaptionMode, Captions, CustomTrack, Encoding, EncodingTier, SourceKind,
    TextTrackDraft, UploadForm, UploadRequest, UploadSource,
};

pub const TITLE_REQUIRED: &str = "No title specified";
pub const FILE_REQUIRED: &str = "No file specified";
pub const FILE_EMPTY: &str = "File is empty";
pub const URL_REQUIRED: &str = "No url specified";
pub const URL_INVALID: &str = "Invalid url";

static LANGUAGE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid regex"));

#[derive(Debug, Validate)]
struct TitleFields {
    #[validate(length(min = 1, message = "No title specified"))]
    title: String,
}

#[derive(Debug, Validate)]
struct RemoteUrlFields {
    #[validate(url(message = "Invalid url"))]
    url: String,
}

/// Flatten validator errors into field-keyed messages.
fn collect(errors: ValidationErrors, into: &mut FieldErrors) {
    for (field, field_errors) in errors.field_errors() {
        if let Some(first) = field_errors.first() {
            let message = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| first.code.to_string());
            into.add(field.to_string(), message);
        }
    }
}

fn validate_title(title: &str, errors: &mut FieldErrors) -> String {
    let fields = TitleFields {
        title: title.trim().to_string(),
    };
    if let Err(e) = fields.validate() {
        collect(e, errors);
    }
    fields.title
}

pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_CODE.is_match(code)
}

fn validate_track_draft(index: usize, draft: &TextTrackDraft, errors: &mut FieldErrors) {
    let key = |field: &str| format!("custom_text_tracks[{}].{}", index, field);

    if draft.language_code.trim().is_empty() {
        errors.add(key("language_code"), "No language code specified");
    } else if !is_valid_language_code(draft.language_code.trim()) {
        errors.add(key("language_code"), "Invalid language code");
    }
    if draft.name.trim().is_empty() {
        errors.add(key("name"), "No name specified");
    }
    if draft.stored_track_id.is_none() && draft.file.is_none() {
        errors.add(key("file"), FILE_REQUIRED);
    }
}

/// Validate the new-upload form and build an [`UploadRequest`].
///
/// Options that only apply to another choice are dropped: smart-encoding settings
/// under baseline encoding, languages unless captions are auto-generated and custom
/// tracks unless captions are uploaded.
pub fn validate_upload_form(form: &UploadForm) -> Result<UploadRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = validate_title(&form.title, &mut errors);

    let source = match form.upload_type {
        SourceKind::File => match &form.file {
            None => {
                errors.add("file", FILE_REQUIRED);
                None
            }
            Some(file) if file.size == 0 => {
                errors.add("file", FILE_EMPTY);
                None
            }
            Some(file) => Some(UploadSource::File(file.clone())),
        },
        SourceKind::RemoteUrl => {
            let url = form.url.trim();
            if url.is_empty() {
                errors.add("url", URL_REQUIRED);
                None
            } else {
                let fields = RemoteUrlFields {
                    url: url.to_string(),
                };
                match fields.validate() {
                    Ok(()) => Some(UploadSource::RemoteUrl(fields.url)),
                    Err(e) => {
                        collect(e, &mut errors);
                        None
                    }
                }
            }
        }
    };

    let encoding = match form.encoding_tier {
        EncodingTier::Baseline => Encoding::Baseline,
        EncodingTier::Smart => Encoding::Smart {
            mp4_support: form.mp4_support,
            max_resolution_tier: form.max_resolution_tier,
        },
    };

    let captions = match form.text_tracks_type {
        CaptionMode::None => Captions::None,
        CaptionMode::Autogenerated => {
            if form.autogenerated_languages.is_empty() {
                errors.add("autogenerated_languages", "Select at least one language");
            }
            for code in &form.autogenerated_languages {
                if find_language(code).is_none() {
                    errors.add(
                        "autogenerated_languages",
                        format!("Unsupported language: {}", code),
                    );
                }
            }
            Captions::Autogenerated(form.autogenerated_languages.clone())
        }
        CaptionMode::Uploaded => {
            let mut tracks = Vec::with_capacity(form.custom_text_tracks.len());
            for (index, draft) in form.custom_text_tracks.iter().enumerate() {
                validate_track_draft(index, draft, &mut errors);
                // A new asset has no stored tracks to refer to.
                match &draft.file {
                    Some(file) => tracks.push(CustomTrack {
                        language_code: draft.language_code.trim().to_string(),
                        name: draft.name.trim().to_string(),
                        closed_captions: draft.closed_captions,
                        file: file.clone(),
                    }),
                    None => errors.add(
                        format!("custom_text_tracks[{}].file", index),
                        FILE_REQUIRED,
                    ),
                }
            }
            Captions::Uploaded(tracks)
        }
    };

    errors.into_result()?;

    // Every branch that leaves `source` empty records an error above.
    let source = source.ok_or_else(|| FieldErrors::single("file", FILE_REQUIRED))?;

    Ok(UploadRequest {
        title,
        source,
        signed_playback: form.signed,
        encoding,
        captions,
    })
}

/// Fields of an existing asset that should be sent to the update endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetChanges {
    pub id: u64,
    pub title: Option<String>,
    pub custom_text_tracks: Option<Vec<TextTrackDraft>>,
}

impl AssetChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.custom_text_tracks.is_none()
    }
}

/// Edit state for an existing asset's title and caption tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEditForm {
    pub id: u64,
    pub title: String,
    pub title_touched: bool,
    pub custom_text_tracks: Vec<TextTrackDraft>,
    initial_tracks: Vec<TextTrackDraft>,
}

impl AssetEditForm {
    pub fn from_asset(asset: &Asset) -> Self {
        let tracks = asset.subtitle_drafts();
        Self {
            id: asset.id,
            title: asset.display_title(),
            title_touched: false,
            custom_text_tracks: tracks.clone(),
            initial_tracks: tracks,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.title_touched = true;
    }

    /// Validate the form and compute what changed. Only a touched title and a
    /// modified track list are included.
    pub fn changes(&self) -> Result<AssetChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let title = validate_title(&self.title, &mut errors);

        let tracks_modified = self.custom_text_tracks != self.initial_tracks;
        if tracks_modified {
            for (index, draft) in self.custom_text_tracks.iter().enumerate() {
                validate_track_draft(index, draft, &mut errors);
            }
        }

        errors.into_result()?;

        Ok(AssetChanges {
            id: self.id,
            title: self.title_touched.then_some(title),
            custom_text_tracks: tracks_modified.then(|| self.custom_text_tracks.clone()),
        })
    }
}
