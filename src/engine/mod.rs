use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::LauncherConfig;
use crate::download::{DownloadEngine, DownloadRequest};
use crate::engine::models::{
    Catalog, LatestPointer, Manifest, Platform, Release, ReleaseSource, Requirements,
    VersionDescriptor,
};
use crate::engine::state::{AppState, UserAction};
use crate::error::{LauncherError, Result};
use crate::networking::NetworkClient;
use crate::selector;

pub mod models;
pub mod state;

/// Drives manifest lookups, version selection and downloads for a
/// presentation layer. Holds no window or UI state of its own.
pub struct LauncherEngine {
    pub state: AppState,
    networking: NetworkClient,
    downloads: DownloadEngine,
    platform: Platform,
    manifest: Option<Manifest>,
    selected: Option<String>,
    cancel_flag: Arc<AtomicBool>,
}

impl LauncherEngine {
    pub fn new(config: &LauncherConfig, cancel_flag: Arc<AtomicBool>) -> Self {
        let networking = NetworkClient::new(config);
        let downloads = DownloadEngine::new(networking.clone(), config.destination.clone());
        Self {
            state: AppState::Idle,
            networking,
            downloads,
            platform: Platform::current(),
            manifest: None,
            selected: None,
            cancel_flag,
        }
    }

    /// Resolve latest-pointer URLs for `platform` instead of the running OS.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Flag polled by a running download. `handle_action` borrows the engine
    /// for the whole transfer, so a download in progress is cancelled by
    /// setting this handle from elsewhere. `UserAction::Download` clears it
    /// before starting.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Current selection resolved against the last fetched manifest.
    pub fn selected_release(&self) -> Option<Release> {
        let version = self.selected.as_deref()?;
        self.manifest.as_ref()?.resolve(version, self.platform)
    }

    pub fn download_destination(&self, version: &str) -> PathBuf {
        self.downloads.destination_for(version, self.platform)
    }

    async fn refresh_manifest(&mut self) -> Result<&Manifest> {
        let manifest = self.networking.fetch_manifest().await?;
        Ok(&*self.manifest.insert(manifest))
    }

    /// All published versions, newest first. A latest-pointer deployment
    /// yields its single release.
    pub async fn list_versions(&mut self) -> Result<Vec<VersionDescriptor>> {
        let platform = self.platform;
        let versions = match self.refresh_manifest().await? {
            Manifest::Catalog(catalog) => catalog.sorted(),
            Manifest::Latest(pointer) => {
                let url = pointer
                    .resolve(platform)
                    .ok_or_else(|| LauncherError::PlatformUnavailable(platform.to_string()))?;
                vec![VersionDescriptor {
                    version: pointer.version.clone(),
                    release_date: String::new(),
                    requirements: Requirements::default(),
                    features: Vec::new(),
                    download_url: url.to_owned(),
                }]
            }
        };
        info!("list_versions: {} version(s) available", versions.len());
        Ok(versions)
    }

    /// The current release. Catalog deployments report their newest entry.
    pub async fn check_for_updates(&mut self) -> Result<LatestPointer> {
        let pointer = match self.refresh_manifest().await? {
            Manifest::Latest(pointer) => pointer.clone(),
            Manifest::Catalog(catalog) => latest_from_catalog(catalog)?,
        };
        info!("check_for_updates: latest version {}", pointer.version);
        Ok(pointer)
    }

    /// Download `url` as `version`, forwarding progress as `AppState::Downloading`.
    pub async fn download_app(
        &self,
        url: &str,
        version: &str,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<PathBuf> {
        let request = DownloadRequest::new(url, version, self.platform);
        self.download_request(&request, updates).await
    }

    pub async fn download_request(
        &self,
        request: &DownloadRequest,
        updates: &mpsc::UnboundedSender<AppState>,
    ) -> Result<PathBuf> {
        let version = request.version.clone();
        updates
            .send(AppState::Downloading {
                version: version.clone(),
                progress: 0.0,
            })
            .ok();
        self.downloads
            .download(request, Some(self.cancel_flag.clone()), |progress| {
                let _ = updates.send(AppState::Downloading {
                    version: version.clone(),
                    progress,
                });
            })
            .await
    }

    pub async fn handle_action(
        &mut self,
        action: UserAction,
        updates: &mpsc::UnboundedSender<AppState>,
    ) {
        match action {
            UserAction::RefreshVersions => {
                info!("action: RefreshVersions");
                updates.send(AppState::LoadingVersions).ok();
                match self.list_versions().await {
                    Ok(versions) => {
                        self.selected =
                            selector::select_default(&versions).map(|d| d.version.clone());
                        debug!("default selection: {:?}", self.selected);
                        self.publish(
                            AppState::VersionsReady {
                                versions,
                                selected: self.selected.clone(),
                            },
                            updates,
                        );
                    }
                    Err(err) => self.fail("refresh failed", err, updates),
                }
            }
            UserAction::CheckForUpdates => {
                info!("action: CheckForUpdates");
                let platform = self.platform;
                let resolved = self.check_for_updates().await.and_then(|pointer| {
                    pointer
                        .latest(platform)
                        .ok_or_else(|| LauncherError::PlatformUnavailable(platform.to_string()))
                });
                match resolved {
                    Ok(release) => {
                        self.selected = Some(release.version.clone());
                        self.publish(AppState::UpdateAvailable { release }, updates);
                    }
                    Err(err) => self.fail("update check failed", err, updates),
                }
            }
            UserAction::SelectVersion(version) => {
                let known = self
                    .manifest
                    .as_ref()
                    .and_then(|m| m.resolve(&version, self.platform))
                    .is_some();
                if known {
                    info!("action: SelectVersion {version}");
                    self.selected = Some(version);
                } else {
                    warn!("action: SelectVersion ignored, {version} is not in the manifest");
                }
            }
            UserAction::Download => {
                let Some(release) = self.selected_release() else {
                    warn!("action: Download ignored ({})", LauncherError::InvalidSelection);
                    return;
                };
                info!("action: Download {}", release.version);
                self.cancel_flag.store(false, Ordering::SeqCst);
                self.state = AppState::Downloading {
                    version: release.version.clone(),
                    progress: 0.0,
                };
                match self
                    .download_app(&release.download_url, &release.version, updates)
                    .await
                {
                    Ok(path) => {
                        info!("downloaded {} to {}", release.version, path.display());
                        self.publish(
                            AppState::Downloaded {
                                version: release.version,
                                path,
                            },
                            updates,
                        );
                    }
                    Err(err) => self.fail("download failed", err, updates),
                }
            }
            UserAction::CancelDownload => {
                self.cancel_flag.store(true, Ordering::SeqCst);
                warn!("action: CancelDownload");
            }
        }
    }

    fn publish(&mut self, state: AppState, updates: &mpsc::UnboundedSender<AppState>) {
        self.state = state.clone();
        updates.send(state).ok();
    }

    fn fail(&mut self, context: &str, err: LauncherError, updates: &mpsc::UnboundedSender<AppState>) {
        error!("{context}: {err}");
        self.publish(AppState::Error(err.to_string()), updates);
    }
}

fn latest_from_catalog(catalog: &Catalog) -> Result<LatestPointer> {
    let newest = selector::select_default(&catalog.versions)
        .ok_or_else(|| LauncherError::ManifestFetch("catalog lists no versions".into()))?;
    let platforms = [Platform::Windows, Platform::Mac]
        .into_iter()
        .map(|p| (p.key().to_owned(), newest.download_url.clone()))
        .collect::<BTreeMap<_, _>>();
    Ok(LatestPointer {
        version: newest.version.clone(),
        platforms,
    })
}
