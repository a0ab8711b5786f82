//! Presentation helpers for asset listings and detail views.

use crate::models::Asset;

/// 1×1 transparent PNG shown while an asset has no playback id yet.
pub const PLACEHOLDER_THUMBNAIL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Format a duration in seconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Short status shown under an asset: its aspect ratio once known, otherwise the
/// processing state.
pub fn status_label(asset: &Asset) -> String {
    if let Some(ratio) = asset.effective_aspect_ratio() {
        return ratio.to_string();
    }
    if asset.is_ready {
        return "No aspect ratio".to_string();
    }
    if asset.has_error() {
        return "Error".to_string();
    }
    "Processing".to_string()
}

pub fn playback_label(asset: &Asset) -> &'static str {
    if asset.signed {
        "Private Playback"
    } else {
        "Public Playback"
    }
}

/// Embed snippet for the provider's web player. Token and environment key are left
/// as placeholders for the integrator to fill in.
pub fn player_snippet(asset: &Asset) -> String {
    format!(
        "<mux-player\n  playback-id=\"{}\"\n  playback-token=\"TOKEN\"\n  env-key=\"ENV_KEY\"\n  metadata-video-title=\"{}\"\n  controls\n/>",
        asset.playback_id.as_deref().unwrap_or_default(),
        escape_attribute(&asset.display_title()),
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(value: serde_json::Value) -> Asset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(9.9), "0:09");
        assert_eq!(format_duration(83.4), "1:23");
        assert_eq!(format_duration(3600.0), "1:00:00");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(-4.0), "0:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn test_status_label_precedence() {
        let a = asset(serde_json::json!({"id": 1, "aspect_ratio": "4:3", "error_message": "boom"}));
        assert_eq!(status_label(&a), "4:3");

        let a = asset(serde_json::json!({"id": 1, "asset_data": {"aspect_ratio": "16:9"}}));
        assert_eq!(status_label(&a), "16:9");

        let a = asset(serde_json::json!({"id": 1, "isReady": true}));
        assert_eq!(status_label(&a), "No aspect ratio");

        let a = asset(serde_json::json!({"id": 1, "error_message": "Input file is invalid"}));
        assert_eq!(status_label(&a), "Error");

        let a = asset(serde_json::json!({"id": 1}));
        assert_eq!(status_label(&a), "Processing");
    }

    #[test]
    fn test_player_snippet() {
        let a = asset(serde_json::json!({
            "id": 1, "title": "Say \"hi\"", "playback_id": "pb123", "signed": true
        }));
        let snippet = player_snippet(&a);
        assert!(snippet.starts_with("<mux-player\n"));
        assert!(snippet.contains("playback-id=\"pb123\""));
        assert!(snippet.contains("metadata-video-title=\"Say &quot;hi&quot;\""));
        assert!(snippet.ends_with("controls\n/>"));
        assert_eq!(playback_label(&a), "Private Playback");
    }

    #[test]
    fn test_placeholder_is_png_data_url() {
        assert!(PLACEHOLDER_THUMBNAIL.starts_with("data:image/png;base64,"));
    }
}
