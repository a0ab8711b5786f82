//! Error types module
//!
//! Upload failures are grouped under [`UploadError`]: pre-flight field validation,
//! failures reported by the chunked transfer, and a fallback for errors whose shape
//! could not be interpreted. Misuse of a session (aborting twice, starting while
//! another upload runs) is reported separately through [`SessionError`].
//!
//! None of these errors are retried automatically. A new attempt is a new session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Message used when neither a provider message nor a captured error message is available.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error encountered";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to a user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "FIELD_VALIDATION")
    fn error_code(&self) -> &'static str;

    /// Whether the same session can make progress after this error
    fn is_recoverable(&self) -> bool;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Emit `error` at the level its metadata asks for.
pub fn log_error<E>(error: &E)
where
    E: ErrorMetadata + fmt::Display + ?Sized,
{
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, "Error occurred"),
        LogLevel::Warn => tracing::warn!(error = %error, code, "Error occurred"),
        LogLevel::Error => tracing::error!(error = %error, code, "Error occurred"),
    }
}

/// Serializable summary of an error for command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub code: &'static str,
    pub recoverable: bool,
}

impl ErrorReport {
    pub fn from_error<E: ErrorMetadata + ?Sized>(error: &E) -> Self {
        Self {
            error: error.client_message(),
            code: error.error_code(),
            recoverable: error.is_recoverable(),
        }
    }
}

/// Field-keyed validation messages (field name -> message).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message recorded for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Validation failed: {0}")]
    FieldValidation(FieldErrors),

    #[error("Upload failed: {0}")]
    Transfer(String),

    #[error("{}", UNKNOWN_ERROR_MESSAGE)]
    Unknown,
}

impl UploadError {
    /// Error for a failure message, falling back to [`UploadError::Unknown`] when the
    /// message carries nothing.
    pub fn from_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() || message == UNKNOWN_ERROR_MESSAGE {
            UploadError::Unknown
        } else {
            UploadError::Transfer(message)
        }
    }

    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            UploadError::FieldValidation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for UploadError {
    fn from(errors: FieldErrors) -> Self {
        UploadError::FieldValidation(errors)
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            UploadError::FieldValidation(_) => "FIELD_VALIDATION",
            UploadError::Transfer(_) => "TRANSFER_ERROR",
            UploadError::Unknown => "UNKNOWN_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::FieldValidation(errors) => errors.to_string(),
            UploadError::Transfer(message) => message.clone(),
            UploadError::Unknown => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            UploadError::FieldValidation(_) => LogLevel::Debug,
            UploadError::Transfer(_) => LogLevel::Warn,
            UploadError::Unknown => LogLevel::Error,
        }
    }
}

/// Misuse of an upload session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session is not in flight (current state: {state})")]
    NotInFlight { state: String },

    #[error("An upload is already in flight")]
    AlreadyInFlight,

    #[error("Session driver has stopped")]
    Closed,
}

impl ErrorMetadata for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotInFlight { .. } => "SESSION_NOT_IN_FLIGHT",
            SessionError::AlreadyInFlight => "SESSION_ALREADY_IN_FLIGHT",
            SessionError::Closed => "SESSION_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::AlreadyInFlight)
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            SessionError::Closed => LogLevel::Error,
            _ => LogLevel::Debug,
        }
    }
}
