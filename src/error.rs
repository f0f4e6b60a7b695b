use std::process::ExitCode;

use thiserror::Error;

/// Result alias for launcher operations.
pub type Result<T> = std::result::Result<T, LauncherError>;

/// Failures surfaced by the launcher core. Every variant is scoped to the call
/// that produced it; the engine stays usable for a later attempt.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("failed to fetch version manifest: {0}")]
    ManifestFetch(String),
    #[error("download failed: {0}")]
    DownloadTransport(String),
    #[error("failed to write download: {0}")]
    DownloadWrite(String),
    #[error("version `{0}` cannot be used as a file name")]
    InvalidVersion(String),
    #[error("no version selected")]
    InvalidSelection,
    #[error("a download is already in progress")]
    DownloadInProgress,
    #[error("download cancelled")]
    Cancelled,
    #[error("no download available for platform `{0}`")]
    PlatformUnavailable(String),
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

impl LauncherError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            LauncherError::ManifestFetch(_) => ExitCode::from(30),
            LauncherError::DownloadTransport(_) => ExitCode::from(31),
            LauncherError::DownloadWrite(_) => ExitCode::from(40),
            LauncherError::InvalidVersion(_) => ExitCode::from(22),
            LauncherError::InvalidSelection => ExitCode::from(20),
            LauncherError::PlatformUnavailable(_) => ExitCode::from(21),
            LauncherError::DownloadInProgress => ExitCode::from(50),
            LauncherError::Cancelled => ExitCode::from(130),
            LauncherError::ChecksumMismatch { .. } => ExitCode::from(41),
        }
    }
}
