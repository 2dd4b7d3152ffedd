//! Error types module
//!
//! All errors are unified under the `AppError` enum which can represent
//! database, storage, image-processing, and domain-specific upload-protocol
//! errors. Each variant self-describes its HTTP presentation through the
//! `ErrorMetadata` trait so the API boundary never has to match on variants.

use sqlx::Error as SqlxError;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "LIMIT_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Image limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Pending upload not found: {0}")]
    PendingNotFound(String),

    #[error("Pending upload expired: {0}")]
    PendingExpired(String),

    #[error("Invalid upload key: {0}")]
    InvalidUploadKey(String),

    #[error("Object not found in storage: {0}")]
    ObjectNotFound(String),

    #[error("Invalid image mime type: {0}")]
    InvalidMime(String),

    #[error("Image size exceeded: {size} bytes exceeds max {max} bytes")]
    SizeExceeded { size: i64, max: i64 },

    #[error("Invalid default image state: {0}")]
    InvalidDefaultState(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, sensitive, log_level). client_message stays per-variant
/// for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::ImageProcessing(_) => (
            400,
            "IMAGE_PROCESSING_ERROR",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication credentials"),
            false,
            LogLevel::Debug,
        ),
        AppError::LimitExceeded(_) => (
            400,
            "LIMIT_EXCEEDED",
            false,
            Some("Delete an existing image or wait for pending uploads to expire"),
            false,
            LogLevel::Debug,
        ),
        AppError::PendingNotFound(_) => (
            404,
            "PENDING_NOT_FOUND",
            false,
            Some("Request a new upload URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::PendingExpired(_) => (
            400,
            "PENDING_EXPIRED",
            false,
            Some("Request a new upload URL"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidUploadKey(_) => (
            400,
            "INVALID_KEY",
            false,
            Some("Confirm with the key returned by the upload-url call"),
            false,
            LogLevel::Debug,
        ),
        AppError::ObjectNotFound(_) => (
            404,
            "OBJECT_NOT_FOUND",
            false,
            Some("Upload the file to the signed URL before confirming"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidMime(_) => (
            400,
            "INVALID_MIME",
            false,
            Some("Use an allowed image mime type"),
            false,
            LogLevel::Debug,
        ),
        AppError::SizeExceeded { .. } => (
            400,
            "SIZE_EXCEEDED",
            false,
            Some("Reduce the image size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidDefaultState(_) => (
            400,
            "INVALID_DEFAULT_STATE",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::StateConflict(_) => (
            409,
            "INVALID_STATE",
            true,
            Some("Retry the request"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::LimitExceeded(_) => "LimitExceeded",
            AppError::PendingNotFound(_) => "PendingNotFound",
            AppError::PendingExpired(_) => "PendingExpired",
            AppError::InvalidUploadKey(_) => "InvalidUploadKey",
            AppError::ObjectNotFound(_) => "ObjectNotFound",
            AppError::InvalidMime(_) => "InvalidMime",
            AppError::SizeExceeded { .. } => "SizeExceeded",
            AppError::InvalidDefaultState(_) => "InvalidDefaultState",
            AppError::StateConflict(_) => "StateConflict",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::ImageProcessing(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::LimitExceeded(ref msg) => msg.clone(),
            AppError::PendingNotFound(ref msg) => msg.clone(),
            AppError::PendingExpired(ref msg) => msg.clone(),
            AppError::InvalidUploadKey(ref msg) => msg.clone(),
            AppError::ObjectNotFound(ref msg) => msg.clone(),
            AppError::InvalidMime(ref msg) => msg.clone(),
            AppError::SizeExceeded { size, max } => {
                format!("Image size exceeded: {} bytes exceeds max {} bytes", size, max)
            }
            AppError::InvalidDefaultState(ref msg) => msg.clone(),
            AppError::StateConflict(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
