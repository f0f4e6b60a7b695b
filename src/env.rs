use std::env;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "ivolution-launcher";

fn home_dir() -> Option<PathBuf> {
    match env::consts::OS {
        "windows" => env::var_os("USERPROFILE")
            .or_else(|| env::var_os("HOME"))
            .map(PathBuf::from),
        _ => env::var_os("HOME").map(PathBuf::from),
    }
}

/// Per-user application data directory (the versioned install root).
pub fn user_data_dir() -> PathBuf {
    let base = match env::consts::OS {
        "windows" => env::var_os("APPDATA")
            .or_else(|| env::var_os("LOCALAPPDATA"))
            .map(PathBuf::from),
        "macos" => home_dir().map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join(".local").join("share"))),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR_NAME)
}

/// The user's downloads folder, used by the flat download layout.
pub fn downloads_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Directory holding every installed version in the versioned layout.
pub fn versions_dir(root: &std::path::Path) -> PathBuf {
    root.join("versions")
}
