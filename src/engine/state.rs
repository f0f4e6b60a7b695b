use std::path::PathBuf;

use crate::engine::models::{Release, VersionDescriptor};

// Everything the presentation layer needs to render; sent one way over the
// updates channel.
#[derive(Clone, Debug, PartialEq)]
pub enum AppState {
    Idle,
    LoadingVersions,
    VersionsReady {
        versions: Vec<VersionDescriptor>,
        selected: Option<String>,
    },
    UpdateAvailable {
        release: Release,
    },
    Downloading {
        version: String,
        /// Percentage in `[0, 100]`.
        progress: f32,
    },
    Downloaded {
        version: String,
        path: PathBuf,
    },
    Error(String),
}

// Actions triggered by the user from the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    RefreshVersions,
    CheckForUpdates,
    SelectVersion(String),
    Download,
    /// Raises the cancel flag. Only reaches a transfer started elsewhere on
    /// the same flag; see `LauncherEngine::cancel_handle`.
    CancelDownload,
}
