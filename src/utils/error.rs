//! Error types and handling
//!
//! Common error types used across the recorder.

use crate::capture::encoder::EncodeError;
use crate::recorder::state::OperatingMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recorder-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Camera binding failed: {0}")]
    StartupBinding(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already recording in {0} mode")]
    AlreadyRecording(OperatingMode),

    #[error("Cannot start {requested} while {active} is active")]
    ModeConflict {
        active: OperatingMode,
        requested: OperatingMode,
    },

    #[error("Invalid mode: {0}")]
    InvalidMode(String),
}

impl RecorderError {
    /// Stable code for the UI layer
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::Io(_) => "IO_ERROR",
            RecorderError::Config(_) | RecorderError::InvalidConfig(_) => "CONFIG_ERROR",
            RecorderError::Encode(_) => "ENCODE_ERROR",
            RecorderError::Capture(_) => "CAPTURE_ERROR",
            RecorderError::StartupBinding(_) => "BINDING_ERROR",
            RecorderError::PermissionDenied(_) => "PERMISSION_DENIED",
            RecorderError::AlreadyRecording(_) => "ALREADY_RECORDING",
            RecorderError::ModeConflict { .. } => "MODE_CONFLICT",
            RecorderError::InvalidMode(_) => "INVALID_MODE",
        }
    }

    /// Whether this error keeps a camera-bearing mode from starting
    pub fn blocks_camera(&self) -> bool {
        matches!(
            self,
            RecorderError::PermissionDenied(_) | RecorderError::StartupBinding(_)
        )
    }
}

/// Error response for the UI collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&RecorderError> for ErrorResponse {
    fn from(error: &RecorderError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<RecorderError> for ErrorResponse {
    fn from(error: RecorderError) -> Self {
        ErrorResponse::from(&error)
    }
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
