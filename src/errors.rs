use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported media type: {content_type}")]
    UnsupportedMedia { content_type: String },

    #[error("No file selected")]
    EmptySelection,

    #[error("No pending selection at index {index}")]
    InvalidSelectionIndex { index: usize },

    #[error("Server rejected upload{}: {reason}", .status.as_ref().map(|s| format!(" ({})", s)).unwrap_or_default())]
    ServerRejection { status: Option<u16>, reason: String },

    #[error("State drift: {reason}")]
    Consistency { reason: String },

    #[error("Upload {attempt_id} is still in flight")]
    AttemptInFlight { attempt_id: String },

    #[error("Upload {attempt_id} was cancelled")]
    UploadCancelled { attempt_id: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

/// How a failure is handled once an attempt reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or empty pick. Dropped without telling the user.
    Selection,
    /// Transport failed or the attempt was abandoned.
    Transfer,
    /// Endpoint answered with a non-success status or an unusable payload.
    ServerRejection,
    /// Durable write lagged behind the shared store.
    Consistency,
    Internal,
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unsupported_media(content_type: &str) -> Self {
        Self::UnsupportedMedia {
            content_type: content_type.to_string(),
        }
    }

    pub fn server_rejection(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::ServerRejection {
            status,
            reason: reason.into(),
        }
    }

    pub fn consistency(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::warn!("Durable snapshot out of sync with shared store: {}", reason);
        Self::Consistency { reason }
    }

    pub fn attempt_in_flight(attempt_id: &str) -> Self {
        Self::AttemptInFlight {
            attempt_id: attempt_id.to_string(),
        }
    }

    pub fn upload_cancelled(attempt_id: &str) -> Self {
        Self::UploadCancelled {
            attempt_id: attempt_id.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::UnsupportedMedia { .. }
            | AppError::EmptySelection
            | AppError::InvalidSelectionIndex { .. } => ErrorClass::Selection,
            AppError::Network(_) | AppError::Io(_) | AppError::UploadCancelled { .. } => {
                ErrorClass::Transfer
            }
            AppError::ServerRejection { .. } => ErrorClass::ServerRejection,
            AppError::Consistency { .. } => ErrorClass::Consistency,
            AppError::Database(_)
            | AppError::Json(_)
            | AppError::AttemptInFlight { .. }
            | AppError::Validation { .. }
            | AppError::Config(_)
            | AppError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Only transfer failures and rejections reach the notification sink.
    pub fn is_surfaced(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Transfer | ErrorClass::ServerRejection
        )
    }
}
