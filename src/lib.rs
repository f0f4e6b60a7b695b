//! Version discovery and download orchestration for the Ivolution launcher.

pub mod config;
pub mod download;
pub mod engine;
pub mod env;
pub mod error;
pub mod networking;
pub mod selector;
pub mod util;

#[cfg(test)]
mod test_support;

pub use config::{DestinationStrategy, LauncherConfig, ManifestVariant};
pub use download::{DownloadEngine, DownloadRequest};
pub use engine::LauncherEngine;
pub use engine::models::{LatestPointer, Manifest, Platform, Release, ReleaseSource, VersionDescriptor};
pub use error::{LauncherError, Result};
