//! clipdesk CLI: upload videos and manage assets through the host CMS plugin.
//!
//! Set CLIPDESK_API_TOKEN and CLIPDESK_API_URL. Uses Bearer auth.

use anyhow::Context;
use clap::{Parser, Subcommand};
use clipdesk_api_client::{resolve_thumbnail, ApiClient, Uploader};
use clipdesk_cli::{
    edit_captions, error_report, format_asset_table, format_language_table, guess_content_type,
    init_tracing, render_progress, CaptionSpec,
};
use clipdesk_core::display::player_snippet;
use clipdesk_core::models::{
    AssetSearch, CaptionMode, EncodingTier, FileHandle, ListAssetsQuery, MaxResolutionTier,
    Mp4Support, SearchField, SortOrder, SourceKind, TextTrackDraft, UploadForm,
    SUPPORTED_LANGUAGES,
};
use clipdesk_core::{AssetEditForm, SessionState, UploadError};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipdesk", about = "Video uploads and assets for the clipdesk CMS plugin")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local video file or register a remote URL
    Upload {
        /// Path to the video file
        #[arg(required_unless_present = "url", conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Remote URL the provider should pull the video from
        #[arg(long)]
        url: Option<String>,
        /// Asset title
        #[arg(long)]
        title: String,
        /// Require signed playback
        #[arg(long)]
        signed: bool,
        /// Use smart encoding instead of baseline
        #[arg(long)]
        smart: bool,
        /// Generate a static MP4 rendition (smart encoding only)
        #[arg(long, requires = "smart")]
        mp4: bool,
        /// Maximum resolution tier (smart encoding only): 1080p, 1440p, 2160p
        #[arg(long, default_value = "1080p")]
        max_resolution: MaxResolutionTier,
        /// Auto-generate captions in these languages (comma separated codes)
        #[arg(long, value_delimiter = ',', conflicts_with = "caption")]
        auto_captions: Vec<String>,
        /// Attach a caption file: LANG:NAME:PATH[:cc] (repeatable)
        #[arg(long)]
        caption: Vec<CaptionSpec>,
    },
    /// List assets with pagination, sort and search
    List {
        /// Index of the first asset
        #[arg(long, default_value = "0")]
        start: u32,
        /// Maximum number of assets
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Sort order: newest, oldest, title, title-desc
        #[arg(long, default_value = "newest")]
        sort: SortOrder,
        /// Search by title
        #[arg(long, conflicts_with = "asset_id")]
        title: Option<String>,
        /// Search by provider asset id
        #[arg(long)]
        asset_id: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Get a single asset by ID
    Get {
        /// Asset ID
        id: u64,
    },
    /// Change an asset's title or caption tracks
    #[command(group(
        clap::ArgGroup::new("change")
            .required(true)
            .multiple(true)
            .args(["title", "caption", "remove_caption"])
    ))]
    Update {
        /// Asset ID
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Add a caption file: LANG:NAME:PATH[:cc] (repeatable)
        #[arg(long)]
        caption: Vec<CaptionSpec>,
        /// Remove stored caption tracks in this language (repeatable)
        #[arg(long)]
        remove_caption: Vec<String>,
    },
    /// Delete an asset from the host and the provider
    Delete {
        /// Asset ID
        id: u64,
    },
    /// Print the thumbnail image source of an asset
    Thumbnail {
        /// Asset ID
        id: u64,
    },
    /// Print a player embed snippet for an asset
    Snippet {
        /// Asset ID
        id: u64,
    },
    /// List languages available for auto-generated captions
    Languages,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn caption_draft(spec: CaptionSpec) -> anyhow::Result<TextTrackDraft> {
    let path = PathBuf::from(&spec.path);
    let handle = FileHandle::from_path(&path)
        .with_context(|| format!("Failed to open caption file: {}", spec.path))?
        .with_content_type(guess_content_type(&path));
    Ok(TextTrackDraft {
        language_code: spec.language_code,
        name: spec.name,
        closed_captions: spec.closed_captions,
        file: Some(handle),
        ..Default::default()
    })
}

#[allow(clippy::too_many_arguments)]
fn build_upload_form(
    file: Option<PathBuf>,
    url: Option<String>,
    title: String,
    signed: bool,
    smart: bool,
    mp4: bool,
    max_resolution: MaxResolutionTier,
    auto_captions: Vec<String>,
    caption: Vec<CaptionSpec>,
) -> anyhow::Result<UploadForm> {
    let (upload_type, file) = match file {
        Some(path) => {
            let handle = FileHandle::from_path(&path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?
                .with_content_type(guess_content_type(&path));
            (SourceKind::File, Some(handle))
        }
        None => (SourceKind::RemoteUrl, None),
    };

    let text_tracks_type = if !auto_captions.is_empty() {
        CaptionMode::Autogenerated
    } else if !caption.is_empty() {
        CaptionMode::Uploaded
    } else {
        CaptionMode::None
    };

    let custom_text_tracks = caption
        .into_iter()
        .map(caption_draft)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(UploadForm {
        title,
        upload_type,
        file,
        url: url.unwrap_or_default(),
        signed,
        encoding_tier: if smart {
            EncodingTier::Smart
        } else {
            EncodingTier::Baseline
        },
        mp4_support: if mp4 {
            Mp4Support::Standard
        } else {
            Mp4Support::None
        },
        max_resolution_tier: max_resolution,
        text_tracks_type,
        autogenerated_languages: auto_captions.into_iter().collect(),
        custom_text_tracks,
    })
}

/// Follow a session until it ends, drawing progress on stderr. Ctrl-C aborts it.
async fn follow_upload(uploader: &mut Uploader, form: UploadForm) -> anyhow::Result<SessionState> {
    let handle = uploader.start(&form).await?;
    let mut updates = handle.subscribe();
    let mut stderr = std::io::stderr();

    loop {
        let state = updates.borrow_and_update().clone();
        let _ = write!(stderr, "\r{}", render_progress(&state));
        let _ = stderr.flush();
        if state.is_terminal() {
            let _ = writeln!(stderr);
            return Ok(state);
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    let _ = writeln!(stderr);
                    return Ok(handle.state());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, aborting upload");
                if let Err(e) = handle.abort().await {
                    tracing::warn!(error = %e, "Abort had no effect");
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        match error_report(&error) {
            Some(report) => match serde_json::to_string_pretty(&report) {
                Ok(out) => eprintln!("{}", out),
                Err(_) => eprintln!("Error: {}", report.error),
            },
            None => eprintln!("Error: {:#}", error),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let connect = || {
        ApiClient::from_env()
            .context("Failed to create API client. Set CLIPDESK_API_TOKEN and CLIPDESK_API_URL")
    };

    match cli.command {
        Commands::Upload {
            file,
            url,
            title,
            signed,
            smart,
            mp4,
            max_resolution,
            auto_captions,
            caption,
        } => {
            let form = build_upload_form(
                file,
                url,
                title,
                signed,
                smart,
                mp4,
                max_resolution,
                auto_captions,
                caption,
            )?;
            let mut uploader = Uploader::new(connect()?)?;
            let state = follow_upload(&mut uploader, form).await?;
            print_json(&state)?;
            if let SessionState::Failed(message) = state {
                return Err(UploadError::from_failure(message).into());
            }
        }
        Commands::List {
            start,
            limit,
            sort,
            title,
            asset_id,
            json,
        } => {
            let search = match (title, asset_id) {
                (Some(value), _) => Some(AssetSearch {
                    field: SearchField::Title,
                    value,
                }),
                (None, Some(value)) => Some(AssetSearch {
                    field: SearchField::AssetId,
                    value,
                }),
                (None, None) => None,
            };
            let query = ListAssetsQuery {
                start,
                limit,
                sort,
                search,
            };
            let page = connect()?.list_assets(&query).await?;
            if json {
                print_json(&page)?;
            } else {
                print!("{}", format_asset_table(&page, start));
            }
        }
        Commands::Get { id } => {
            let asset = connect()?.get_asset(id).await?;
            print_json(&asset)?;
        }
        Commands::Update {
            id,
            title,
            caption,
            remove_caption,
        } => {
            let client = connect()?;
            let asset = client.get_asset(id).await?;
            let mut form = AssetEditForm::from_asset(&asset);
            if let Some(title) = title {
                form.set_title(title);
            }
            let added = caption
                .into_iter()
                .map(caption_draft)
                .collect::<anyhow::Result<Vec<_>>>()?;
            edit_captions(&mut form, &remove_caption, added);
            let changes = form.changes().map_err(UploadError::from)?;
            match client.update_asset(&changes).await? {
                Some(updated) => print_json(&updated)?,
                None => println!("Nothing to update"),
            }
        }
        Commands::Delete { id } => {
            let client = connect()?;
            let asset = client.get_asset(id).await?;
            client.delete_asset(&asset).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Asset {} deleted", id) }),
            )?;
        }
        Commands::Thumbnail { id } => {
            let client = connect()?;
            let asset = client.get_asset(id).await?;
            let source =
                resolve_thumbnail(&client, asset.playback_id.as_deref(), asset.signed).await?;
            println!("{}", source);
        }
        Commands::Snippet { id } => {
            let client = connect()?;
            let asset = client.get_asset(id).await?;
            println!("{}", player_snippet(&asset));
        }
        Commands::Languages => {
            print!("{}", format_language_table(SUPPORTED_LANGUAGES));
        }
    }

    Ok(())
}
