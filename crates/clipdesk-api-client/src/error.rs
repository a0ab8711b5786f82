use clipdesk_core::error::{ErrorMetadata, LogLevel, UNKNOWN_ERROR_MESSAGE};
use clipdesk_core::{FieldErrors, SessionError, UploadError};
use serde_json::Value;

/// Errors returned by [`crate::ApiClient`] calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload rejected: {0}")]
    Rejected(FieldErrors),
}

impl ApiError {
    /// Message shown to a user: the provider's own text when it sent one, otherwise
    /// the message of the captured error, otherwise a fixed fallback.
    pub fn failure_message(&self) -> String {
        let message = match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Rejected(errors) => errors.to_string(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl ErrorMetadata for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Status { .. } => "API_STATUS",
            ApiError::Request(_) => "API_REQUEST",
            ApiError::Decode(_) => "API_DECODE",
            ApiError::Io(_) => "IO_ERROR",
            ApiError::Rejected(_) => "UPLOAD_REJECTED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status >= 500 || *status == 408,
            ApiError::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    fn client_message(&self) -> String {
        self.failure_message()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ApiError::Rejected(_) => LogLevel::Debug,
            ApiError::Status { status, .. } if *status < 500 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<ApiError> for UploadError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Rejected(errors) => UploadError::FieldValidation(errors),
            other => UploadError::from_failure(other.failure_message()),
        }
    }
}

/// Why [`crate::Uploader::start`] refused to create a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ErrorMetadata for StartError {
    fn error_code(&self) -> &'static str {
        match self {
            StartError::Upload(e) => e.error_code(),
            StartError::Session(e) => e.error_code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            StartError::Upload(e) => e.is_recoverable(),
            StartError::Session(e) => e.is_recoverable(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            StartError::Upload(e) => e.client_message(),
            StartError::Session(e) => e.client_message(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StartError::Upload(e) => e.log_level(),
            StartError::Session(e) => e.log_level(),
        }
    }
}

impl From<FieldErrors> for StartError {
    fn from(errors: FieldErrors) -> Self {
        StartError::Upload(UploadError::FieldValidation(errors))
    }
}

/// Pull the human-readable message out of an error response body.
///
/// Understands `{"error": {"message": ..}}`, `{"message": ..}`, `{"error": ".."}`
/// and a bare JSON string; anything else is returned as trimmed text.
pub(crate) fn provider_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    let found = match &value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .and_then(Value::as_str)
            .or_else(|| map.get("message").and_then(Value::as_str)),
        _ => None,
    };
    found
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Convert a validation payload into field errors. Accepts a map of field to
/// message (or list of messages) and a list of `{ path, message }` entries.
pub(crate) fn field_errors_from(value: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match value {
        Value::Object(map) => {
            for (field, message) in map {
                let text = match message {
                    Value::String(s) => Some(s.clone()),
                    Value::Array(items) => items.iter().find_map(|m| m.as_str().map(String::from)),
                    _ => None,
                };
                if let Some(text) = text {
                    errors.add(field.as_str(), text);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                let Some(message) = item.get("message").and_then(Value::as_str) else {
                    continue;
                };
                let field = match item.get("path") {
                    Some(Value::Array(parts)) => parts
                        .iter()
                        .map(|p| match p {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("."),
                    Some(Value::String(s)) => s.clone(),
                    _ => String::new(),
                };
                let field = if field.is_empty() { "form".to_string() } else { field };
                errors.add(field, message);
            }
        }
        _ => {}
    }
    if errors.is_empty() {
        errors.add("form", UNKNOWN_ERROR_MESSAGE);
    }
    errors
}
