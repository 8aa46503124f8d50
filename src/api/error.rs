use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response;
use crate::simulation::{RunError, StageError};

/// Every way a simulation request can fail.
///
/// The `Display` text is what the caller sees in the `error` field.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Only POST method is allowed")]
    MethodNotAllowed,

    #[error("No file uploaded")]
    MissingFile,

    #[error("File upload failed with error code {code}")]
    UploadError { code: u16, detail: String },

    #[error("Invalid file type. Only CSV files are allowed.")]
    InvalidFileType { detected: &'static str },

    #[error("Failed to move uploaded file")]
    StorageError(#[from] StageError),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulation output file not found")]
    ResultMissing,

    #[error("Simulation output file could not be read")]
    ResultUnreadable(String),
}

impl ApiError {
    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MethodNotAllowed => "MethodNotAllowed",
            ApiError::MissingFile => "MissingFile",
            ApiError::UploadError { .. } => "UploadError",
            ApiError::InvalidFileType { .. } => "InvalidFileType",
            ApiError::StorageError(_) => "StorageError",
            ApiError::SimulationFailed(_) => "SimulationFailed",
            ApiError::ResultMissing => "ResultMissing",
            ApiError::ResultUnreadable(_) => "ResultUnreadable",
        }
    }
}

impl From<RunError> for ApiError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Spawn { .. } | RunError::TimedOut(_) => {
                ApiError::SimulationFailed(error.to_string())
            }
            RunError::Failed { output, .. } => ApiError::SimulationFailed(output),
            RunError::ResultMissing(_) => ApiError::ResultMissing,
            RunError::ResultUnreadable { .. } => ApiError::ResultUnreadable(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::StorageError(source) => {
                tracing::error!(kind = self.kind(), error = %source, "Simulation request failed");
            }
            ApiError::UploadError { code, detail } => {
                tracing::warn!(
                    kind = self.kind(),
                    code,
                    detail = %detail,
                    "Simulation request failed"
                );
            }
            ApiError::InvalidFileType { detected } => {
                tracing::warn!(kind = self.kind(), detected, "Simulation request failed");
            }
            ApiError::ResultUnreadable(detail) => {
                tracing::error!(kind = self.kind(), detail = %detail, "Simulation request failed");
            }
            ApiError::SimulationFailed(_) | ApiError::ResultMissing => {
                tracing::warn!(kind = self.kind(), error = %self, "Simulation request failed");
            }
            ApiError::MethodNotAllowed | ApiError::MissingFile => {
                tracing::debug!(kind = self.kind(), "Client error");
            }
        }

        response::error(self.to_string()).into_response()
    }
}
