use thiserror::Error;

/// Application-level error type covering every failure the engine can surface.
///
/// Each variant maps to one failure class of the capability boundary or the
/// analysis workflow. The session layer additionally carries its own
/// `SessionError` (kind + message) inside `SessionState`; see `session`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Platform unavailable: {0}")]
    PlatformUnavailable(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Malformed feedback payload: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-readable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::PlatformUnavailable(_) => "PLATFORM_UNAVAILABLE",
            AppError::Identity(_) => "IDENTITY_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::Conversion(_) => "CONVERSION_ERROR",
            AppError::Inference(_) => "INFERENCE_ERROR",
            AppError::Parse(_) => "PARSE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
