use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Response;
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::config::DestinationStrategy;
use crate::engine::models::Platform;
use crate::env;
use crate::error::{LauncherError, Result};
use crate::networking::NetworkClient;
use crate::util::{cancel_requested, format_speed, progress_percent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub version: String,
    pub platform: Platform,
    /// Lower-case hex SHA-256 the payload must match. Unchecked when absent.
    pub expected_sha256: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, version: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            version: version.into(),
            platform,
            expected_sha256: None,
        }
    }

    pub fn with_sha256(mut self, hex: impl Into<String>) -> Self {
        self.expected_sha256 = Some(hex.into().trim().to_ascii_lowercase());
        self
    }
}

/// Reject versions that would not stay a single path segment once joined
/// under the destination directory.
pub fn validate_version(version: &str) -> Result<()> {
    let single_segment = matches!(
        Path::new(version).components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(name)] if *name == OsStr::new(version)
    );
    if !single_segment
        || version.contains(['/', '\\'])
        || version.contains("..")
        || Path::new(version).is_absolute()
    {
        return Err(LauncherError::InvalidVersion(version.to_owned()));
    }
    Ok(())
}

/// Where `version` lands for the given layout. Callers check the version with
/// [`validate_version`] first.
pub fn destination_path(strategy: &DestinationStrategy, version: &str, platform: Platform) -> PathBuf {
    match strategy {
        DestinationStrategy::VersionedDirectory { root, binary_name } => {
            env::versions_dir(root).join(version).join(binary_name)
        }
        DestinationStrategy::FlatDownloads { dir, app_name } => {
            dir.join(format!("{app_name}_v{version}{}", platform.extension()))
        }
    }
}

/// Byte accounting for one transfer.
struct DownloadState {
    total_bytes: Option<u64>,
    bytes_received: u64,
    last_percent: f32,
}

impl DownloadState {
    fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes: total_bytes.filter(|total| *total > 0),
            bytes_received: 0,
            last_percent: 0.0,
        }
    }

    /// Record a chunk and return the percentage to report, if the total is known.
    fn advance(&mut self, len: usize) -> Option<f32> {
        self.bytes_received += len as u64;
        let pct = progress_percent(self.bytes_received, self.total_bytes)?;
        self.last_percent = self.last_percent.max(pct);
        Some(self.last_percent)
    }
}

/// Releases the single-flight slot when the transfer ends, however it ends.
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Streams release binaries to disk. At most one transfer runs at a time per
/// engine; a second concurrent call is rejected rather than queued.
#[derive(Clone)]
pub struct DownloadEngine {
    network: NetworkClient,
    destination: DestinationStrategy,
    in_flight: Arc<AtomicBool>,
}

impl DownloadEngine {
    pub fn new(network: NetworkClient, destination: DestinationStrategy) -> Self {
        Self {
            network,
            destination,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn destination_for(&self, version: &str, platform: Platform) -> PathBuf {
        destination_path(&self.destination, version, platform)
    }

    fn acquire(&self) -> Result<FlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| LauncherError::DownloadInProgress)?;
        Ok(FlightGuard(self.in_flight.clone()))
    }

    /// Download `request` and return the absolute path of the written file.
    ///
    /// `progress` receives a percentage in `[0, 100]` after every chunk, but
    /// only when the server declares a content length.
    pub async fn download<F>(
        &self,
        request: &DownloadRequest,
        cancel: Option<Arc<AtomicBool>>,
        mut progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(f32),
    {
        let _guard = self.acquire()?;
        if cancel_requested(&cancel) {
            warn!("download: cancelled before start");
            return Err(LauncherError::Cancelled);
        }
        validate_version(&request.version).inspect_err(|err| warn!("download: {err}"))?;

        let dest = self.destination_for(&request.version, request.platform);
        let dest = std::path::absolute(&dest).unwrap_or(dest);
        info!(
            "download: version {} from {} to {}",
            request.version,
            request.url,
            dest.display()
        );

        let response = self.network.open_download(&request.url).await?;

        if let DestinationStrategy::VersionedDirectory { .. } = self.destination
            && let Some(parent) = dest.parent()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                LauncherError::DownloadWrite(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let file = File::create(&dest).await.map_err(|e| {
            LauncherError::DownloadWrite(format!("failed to create {}: {e}", dest.display()))
        })?;

        match stream_to_file(response, file, request, &cancel, &mut progress).await {
            Ok(()) => Ok(dest),
            Err(err) => {
                warn!("download: {err}; removing partial file {}", dest.display());
                let _ = fs::remove_file(&dest).await;
                Err(err)
            }
        }
    }
}

async fn stream_to_file<F>(
    response: Response,
    mut file: File,
    request: &DownloadRequest,
    cancel: &Option<Arc<AtomicBool>>,
    progress: &mut F,
) -> Result<()>
where
    F: FnMut(f32),
{
    let mut state = DownloadState::new(response.content_length());
    let mut hasher = request.expected_sha256.as_ref().map(|_| Sha256::new());
    let started = Instant::now();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel_requested(cancel) {
            return Err(LauncherError::Cancelled);
        }
        let chunk =
            chunk.map_err(|e| LauncherError::DownloadTransport(format!("stream error: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::DownloadWrite(format!("write error: {e}")))?;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&chunk);
        }
        if let Some(pct) = state.advance(chunk.len()) {
            progress(pct);
        }
        debug!(
            "download: {} of {:?} bytes",
            state.bytes_received, state.total_bytes
        );
    }

    file.flush()
        .await
        .map_err(|e| LauncherError::DownloadWrite(format!("flush error: {e}")))?;

    if let Some(total) = state.total_bytes
        && state.bytes_received < total
    {
        return Err(LauncherError::DownloadTransport(format!(
            "download incomplete: received {} of {} bytes",
            state.bytes_received, total
        )));
    }

    if let (Some(expected), Some(hasher)) = (request.expected_sha256.as_deref(), hasher) {
        verify_digest(expected, hasher)?;
    }

    let secs = started.elapsed().as_secs_f32().max(f32::EPSILON);
    info!(
        "download: finished {} bytes ({})",
        state.bytes_received,
        format_speed(state.bytes_received as f32 / secs)
    );
    Ok(())
}

fn verify_digest(expected: &str, hasher: Sha256) -> Result<()> {
    let actual = format!("{:x}", hasher.finalize());
    if actual != expected {
        return Err(LauncherError::ChecksumMismatch {
            expected: expected.to_owned(),
            actual,
        });
    }
    debug!("download: checksum verified");
    Ok(())
}

/// Size of an already downloaded file, if present.
pub async fn existing_download(path: &Path) -> Option<u64> {
    fs::metadata(path).await.ok().map(|meta| meta.len())
}
