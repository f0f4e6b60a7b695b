use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::selector;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSpec {
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub gpu: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub minimal: RequirementSpec,
    #[serde(default)]
    pub recommended: RequirementSpec,
}

/// One entry of the catalog manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub version: String,
    #[serde(alias = "releaseDate")]
    pub release_date: String,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(rename = "downloadUrl", alias = "download_url")]
    pub download_url: String,
}

impl VersionDescriptor {
    /// Release timestamp, if the manifest value is RFC 3339 or a bare `YYYY-MM-DD` date.
    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        parse_release_date(&self.release_date)
    }
}

pub fn parse_release_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Body of `versions/index.json`.
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogDocument {
    pub versions: Vec<VersionDescriptor>,
}

/// Body of `latest-metadata.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestPointer {
    pub version: String,
    pub platforms: BTreeMap<String, String>,
}

impl LatestPointer {
    /// Download URL for the given platform, if the pointer publishes one.
    pub fn resolve(&self, platform: Platform) -> Option<&str> {
        self.platforms.get(platform.key()).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Mac,
}

impl Platform {
    /// The platform the launcher itself runs on. Anything that is not Windows
    /// is served the mac build.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Mac
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Mac => "mac",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Platform::Windows => ".exe",
            Platform::Mac => ".app",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A fetchable release already resolved for one platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub download_url: String,
}

/// Anything that can enumerate releases and resolve one to a platform URL.
pub trait ReleaseSource {
    /// Every available release, newest first.
    fn releases(&self, platform: Platform) -> Vec<Release>;

    fn resolve(&self, version: &str, platform: Platform) -> Option<Release> {
        self.releases(platform)
            .into_iter()
            .find(|release| release.version == version)
    }

    fn latest(&self, platform: Platform) -> Option<Release> {
        self.releases(platform).into_iter().next()
    }
}

/// Multi-version catalog. Catalog builds are platform independent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    pub versions: Vec<VersionDescriptor>,
}

impl Catalog {
    pub fn new(versions: Vec<VersionDescriptor>) -> Self {
        Self { versions }
    }

    pub fn sorted(&self) -> Vec<VersionDescriptor> {
        selector::sorted_by_release_date(&self.versions)
    }
}

impl ReleaseSource for Catalog {
    fn releases(&self, _platform: Platform) -> Vec<Release> {
        self.sorted()
            .into_iter()
            .map(|descriptor| Release {
                version: descriptor.version,
                download_url: descriptor.download_url,
            })
            .collect()
    }
}

impl ReleaseSource for LatestPointer {
    fn releases(&self, platform: Platform) -> Vec<Release> {
        self.resolve(platform)
            .map(|url| Release {
                version: self.version.clone(),
                download_url: url.to_owned(),
            })
            .into_iter()
            .collect()
    }
}

/// Parsed manifest in whichever shape the deployment publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Manifest {
    Catalog(Catalog),
    Latest(LatestPointer),
}

impl ReleaseSource for Manifest {
    fn releases(&self, platform: Platform) -> Vec<Release> {
        match self {
            Manifest::Catalog(catalog) => catalog.releases(platform),
            Manifest::Latest(pointer) => pointer.releases(platform),
        }
    }
}
