use clipdesk_api_client::{ApiError, StartError};
use clipdesk_core::display::{format_duration, playback_label, status_label};
use clipdesk_core::models::{AssetListResponse, Language, TextTrackDraft};
use clipdesk_core::{
    log_error, AssetEditForm, ErrorMetadata, ErrorReport, SessionError, SessionState, UploadError,
};
use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Content type for a local file, from its extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("vtt") => "text/vtt",
        Some("srt") => "application/x-subrip",
        _ => "application/octet-stream",
    }
}

/// A `--caption` argument: `LANG:NAME:PATH`, optionally suffixed with `:cc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSpec {
    pub language_code: String,
    pub name: String,
    pub path: String,
    pub closed_captions: bool,
}

impl std::str::FromStr for CaptionSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(language_code), Some(name), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("Invalid caption: {}. Expected LANG:NAME:PATH[:cc]", s));
        };
        let (path, closed_captions) = match rest.strip_suffix(":cc") {
            Some(path) => (path, true),
            None => (rest, false),
        };
        if path.is_empty() {
            return Err(format!("Invalid caption: {}. Missing file path", s));
        }
        Ok(Self {
            language_code: language_code.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            closed_captions,
        })
    }
}

/// Drop caption tracks whose language is in `remove`, then append `add`.
pub fn edit_captions(form: &mut AssetEditForm, remove: &[String], add: Vec<TextTrackDraft>) {
    form.custom_text_tracks
        .retain(|track| !remove.contains(&track.language_code));
    form.custom_text_tracks.extend(add);
}

/// Single-line progress indicator for an upload session.
pub fn render_progress(state: &SessionState) -> String {
    match state {
        SessionState::InFlight(percent) => {
            let filled = usize::from(*percent) / 5;
            format!(
                "[{}{}] {:>3}%",
                "#".repeat(filled),
                " ".repeat(20 - filled),
                percent
            )
        }
        SessionState::Idle => "Waiting...".to_string(),
        SessionState::Complete => "Upload complete".to_string(),
        SessionState::Failed(message) => format!("Upload failed: {}", message),
        SessionState::Aborted => "Upload aborted".to_string(),
    }
}

pub fn format_asset_table(list: &AssetListResponse, start: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Assets ===\n");
    let shown_to = u64::from(start) + list.items.len() as u64;
    let _ = writeln!(
        out,
        "Total: {} assets (showing {} to {} of {})",
        list.total_count,
        if list.items.is_empty() { start } else { start + 1 },
        shown_to.min(list.total_count),
        list.total_count
    );

    if list.items.is_empty() {
        let _ = writeln!(out, "\nNo assets found.");
        return out;
    }

    let _ = writeln!(
        out,
        "\n{:<6} {:<30} {:<16} {:<17} {:>9} {:>20}",
        "ID", "Title", "Status", "Playback", "Duration", "Created At"
    );
    let _ = writeln!(out, "{}", "-".repeat(103));

    for asset in &list.items {
        let _ = writeln!(
            out,
            "{:<6} {:<30} {:<16} {:<17} {:>9} {:>20}",
            asset.id,
            truncate_string(&asset.display_title(), 30),
            truncate_string(&status_label(asset), 16),
            playback_label(asset),
            asset.duration.map(format_duration).unwrap_or_default(),
            asset
                .created_at
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        );
    }

    if shown_to < list.total_count {
        let _ = writeln!(out, "\n... (more assets available, use --start to see more)");
    }
    out
}

pub fn format_language_table(languages: &[Language]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<6} {}", "Code", "Language");
    for language in languages {
        let _ = writeln!(out, "{:<6} {}", language.code, language.name);
    }
    out
}

fn report<E: ErrorMetadata + fmt::Display>(error: &E) -> ErrorReport {
    log_error(error);
    ErrorReport::from_error(error)
}

/// Report for an error raised by the client crates, logged at its own level.
/// Other errors (configuration, I/O) yield `None`.
pub fn error_report(error: &anyhow::Error) -> Option<ErrorReport> {
    if let Some(e) = error.downcast_ref::<ApiError>() {
        Some(report(e))
    } else if let Some(e) = error.downcast_ref::<StartError>() {
        Some(report(e))
    } else if let Some(e) = error.downcast_ref::<UploadError>() {
        Some(report(e))
    } else {
        error.downcast_ref::<SessionError>().map(report)
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
