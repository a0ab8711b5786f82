//! clipdesk core library
//!
//! This crate provides the domain models, error types, configuration, validation and
//! the upload session state machine shared by the clipdesk client and CLI.

pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{
    log_error, ErrorMetadata, ErrorReport, FieldErrors, LogLevel, SessionError, UploadError,
};
pub use session::{SessionEvent, SessionState, UploadSession};
pub use validation::{validate_upload_form, AssetEditForm};
