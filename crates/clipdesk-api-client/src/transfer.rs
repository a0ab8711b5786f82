//! Chunked transfer of a local file to the provider's upload target.
//!
//! The file is sent as sequential `PUT` requests carrying a `Content-Range` header.
//! A chunk answered with a temporary status (408, 502, 503, 504) or lost at the
//! transport level is sent again after a fixed delay, up to the configured number
//! of attempts. Progress is reported after every acknowledged chunk.

use bytes::Bytes;
use clipdesk_core::models::FileHandle;
use clipdesk_core::session::SessionEvent;
use clipdesk_core::ClientConfig;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::io::SeekFrom;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SUCCESS_STATUSES: [u16; 5] = [200, 201, 202, 204, 308];
const TEMPORARY_STATUSES: [u16; 4] = [408, 502, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub chunk_size: u64,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl TransferOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            chunk_size: config.chunk_size_bytes(),
            max_attempts: config.chunk_attempts.max(1),
            retry_delay: Duration::from_millis(config.chunk_retry_delay_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum TransferError {
    #[error("Upload cancelled")]
    Cancelled,

    #[error("File is empty")]
    EmptyFile,

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server responded with {status}. Stopping upload.")]
    Status { status: u16 },

    #[error("Chunk {index} failed after {attempts} attempts: {last}")]
    Exhausted {
        index: u64,
        attempts: u32,
        last: String,
    },
}

/// One file transfer to a provider upload URL.
#[derive(Debug, Clone)]
pub struct ChunkedTransfer {
    client: Client,
    endpoint: String,
    file: FileHandle,
    options: TransferOptions,
}

impl ChunkedTransfer {
    pub fn new(client: Client, endpoint: String, file: FileHandle, options: TransferOptions) -> Self {
        Self {
            client,
            endpoint,
            file,
            options,
        }
    }

    /// Run the transfer, reporting progress, success or failure on `events`.
    ///
    /// Nothing is reported once `cancel` fires; the caller already knows.
    pub async fn run<M>(self, events: mpsc::Sender<M>, cancel: CancellationToken)
    where
        M: From<SessionEvent> + Send,
    {
        let outcome = self.upload(&events, &cancel).await;
        let event = match outcome {
            Ok(()) => SessionEvent::Success,
            Err(TransferError::Cancelled) => {
                tracing::info!(endpoint = %self.endpoint, "Upload cancelled");
                return;
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "Upload failed");
                SessionEvent::Error(e.to_string())
            }
        };
        let _ = events.send(M::from(event)).await;
    }

    async fn upload<M>(
        &self,
        events: &mpsc::Sender<M>,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError>
    where
        M: From<SessionEvent> + Send,
    {
        let mut file = tokio::fs::File::open(&self.file.path).await?;
        let total = file.metadata().await?.len();
        if total == 0 {
            return Err(TransferError::EmptyFile);
        }

        let chunk_size = self.options.chunk_size.max(1);
        let chunk_count = total.div_ceil(chunk_size);
        tracing::info!(
            file = %self.file.name,
            size = total,
            chunks = chunk_count,
            "Starting chunked upload"
        );

        let mut offset = 0u64;
        let mut index = 0u64;
        while offset < total {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let len = chunk_size.min(total - offset);
            let mut buffer = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(offset)).await?;
            file.read_exact(&mut buffer).await?;

            let end = offset + len - 1;
            self.send_chunk(index, offset, end, total, Bytes::from(buffer), cancel)
                .await?;

            offset += len;
            index += 1;
            let percent = (offset * 100 / total) as f64;
            tracing::debug!(chunk = index, of = chunk_count, percent, "Chunk acknowledged");
            if events.send(M::from(SessionEvent::Progress(percent))).await.is_err() {
                // Nobody is listening anymore.
                return Err(TransferError::Cancelled);
            }
        }

        Ok(())
    }

    async fn send_chunk(
        &self,
        index: u64,
        start: u64,
        end: u64,
        total: u64,
        chunk: Bytes,
        cancel: &CancellationToken,
    ) -> Result<(), TransferError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = self
                .client
                .put(&self.endpoint)
                .header(CONTENT_TYPE, self.file.content_type.as_str())
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", start, end, total))
                .body(chunk.clone());

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                result = request.send() => result,
            };

            let last = match result {
                Ok(response) => {
                    let status = response.status();
                    if SUCCESS_STATUSES.contains(&status.as_u16()) {
                        return Ok(());
                    }
                    if !TEMPORARY_STATUSES.contains(&status.as_u16()) {
                        return Err(TransferError::Status {
                            status: status.as_u16(),
                        });
                    }
                    describe(status)
                }
                Err(e) => e.to_string(),
            };

            if attempt >= self.options.max_attempts {
                return Err(TransferError::Exhausted {
                    index,
                    attempts: attempt,
                    last,
                });
            }

            tracing::warn!(
                chunk = index,
                attempt,
                max_attempts = self.options.max_attempts,
                reason = %last,
                "Chunk failed, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                _ = tokio::time::sleep(self.options.retry_delay) => {}
            }
        }
    }
}

fn describe(status: StatusCode) -> String {
    format!("server responded with {}", status.as_u16())
}
