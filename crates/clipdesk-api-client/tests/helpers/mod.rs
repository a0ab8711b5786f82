//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use clipdesk_api_client::{ApiClient, TransferOptions, Uploader};
use clipdesk_core::models::{FileHandle, SourceKind, UploadForm};
use clipdesk_core::ClientConfig;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

pub const TOKEN: &str = "test-token";
pub const PREFIX: &str = "/mux-video-uploader";
/// Smallest legal chunk (256 KiB).
pub const CHUNK: u64 = 256 * 1024;

pub fn client(server: &mockito::Server) -> ApiClient {
    let mut config = ClientConfig::new(server.url(), TOKEN);
    config.chunk_size_kb = 256;
    config.chunk_attempts = 2;
    config.chunk_retry_delay_ms = 10;
    ApiClient::new(config).expect("valid test config")
}

pub fn uploader(server: &mockito::Server) -> Uploader {
    Uploader::new(client(server)).expect("uploader")
}

/// Uploader that waits a long time before re-sending a failed chunk, so a session
/// stays in flight for as long as a test needs.
pub fn slow_retry_uploader(server: &mockito::Server) -> Uploader {
    uploader(server).with_options(TransferOptions {
        chunk_size: CHUNK,
        max_attempts: 5,
        retry_delay: Duration::from_secs(60),
    })
}

pub fn write_file(dir: &Path, name: &str, size: usize) -> FileHandle {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture");
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    file.write_all(&data).expect("write fixture");
    FileHandle::from_path(&path)
        .expect("stat fixture")
        .with_content_type("video/mp4")
}

pub fn file_form(title: &str, file: FileHandle) -> UploadForm {
    UploadForm {
        title: title.to_string(),
        upload_type: SourceKind::File,
        file: Some(file),
        ..Default::default()
    }
}

pub fn url_form(title: &str, url: &str) -> UploadForm {
    UploadForm {
        title: title.to_string(),
        upload_type: SourceKind::RemoteUrl,
        url: url.to_string(),
        ..Default::default()
    }
}

pub fn path(route: &str) -> String {
    format!("{}{}", PREFIX, route)
}
