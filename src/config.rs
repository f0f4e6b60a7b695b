use std::path::PathBuf;
use std::time::Duration;

use crate::env;

pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com/TU_BUCKET";
pub const CATALOG_PATH: &str = "versions/index.json";
pub const LATEST_PATH: &str = "latest-metadata.json";
pub const DEFAULT_APP_NAME: &str = "ivolution";
pub const DEFAULT_BINARY_NAME: &str = "ivolution.exe";

/// Which manifest shape the deployment publishes. A deployment uses exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ManifestVariant {
    /// `<base>/versions/index.json`, a list of every published version.
    #[default]
    Catalog,
    /// `<base>/latest-metadata.json`, the current release with per-platform URLs.
    Latest,
}

impl ManifestVariant {
    pub fn path(self) -> &'static str {
        match self {
            ManifestVariant::Catalog => CATALOG_PATH,
            ManifestVariant::Latest => LATEST_PATH,
        }
    }
}

/// Where a finished download lands on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestinationStrategy {
    /// `<root>/versions/<version>/<binary_name>`, parents created on demand.
    VersionedDirectory { root: PathBuf, binary_name: String },
    /// `<dir>/<app_name>_v<version><ext>`, the directory must already exist.
    FlatDownloads { dir: PathBuf, app_name: String },
}

impl DestinationStrategy {
    pub fn versioned_default() -> Self {
        DestinationStrategy::VersionedDirectory {
            root: env::user_data_dir(),
            binary_name: DEFAULT_BINARY_NAME.to_owned(),
        }
    }

    pub fn flat_default() -> Self {
        DestinationStrategy::FlatDownloads {
            dir: env::downloads_dir(),
            app_name: DEFAULT_APP_NAME.to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LauncherConfig {
    pub base_url: String,
    pub variant: ManifestVariant,
    pub destination: DestinationStrategy,
    pub connect_timeout: Duration,
    /// Idle time allowed between two reads; there is no total request timeout.
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            variant: ManifestVariant::default(),
            destination: DestinationStrategy::versioned_default(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            user_agent: format!("ivolution-launcher/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl LauncherConfig {
    /// Full manifest URL for the configured variant.
    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.variant.path()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_manifest_urls_per_variant() {
        let mut config = LauncherConfig {
            base_url: "http://x/bucket/".into(),
            ..Default::default()
        };
        assert_eq!(config.manifest_url(), "http://x/bucket/versions/index.json");
        config.variant = ManifestVariant::Latest;
        assert_eq!(config.manifest_url(), "http://x/bucket/latest-metadata.json");
    }

    #[test]
    fn versioned_layout_is_the_default() {
        let config = LauncherConfig::default();
        assert!(matches!(
            config.destination,
            DestinationStrategy::VersionedDirectory { .. }
        ));
    }
}
