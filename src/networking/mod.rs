use log::{debug, info, warn};
use reqwest::{Client, Response};

use crate::config::{LauncherConfig, ManifestVariant};
use crate::engine::models::{Catalog, CatalogDocument, LatestPointer, Manifest};
use crate::error::{LauncherError, Result};

#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
    manifest_url: String,
    variant: ManifestVariant,
}

impl NetworkClient {
    pub fn new(config: &LauncherConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            client,
            manifest_url: config.manifest_url(),
            variant: config.variant,
        }
    }

    /// Fetch and parse the deployment's manifest. Single attempt, no retry.
    pub async fn fetch_manifest(&self) -> Result<Manifest> {
        let url = &self.manifest_url;
        info!("manifest: fetching {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| manifest_failure(format!("GET {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| manifest_failure(format!("manifest status error: {e}")))?
            .bytes()
            .await
            .map_err(|e| manifest_failure(format!("failed to read manifest body: {e}")))?;
        debug!("manifest: received {} bytes", body.len());
        parse_manifest(self.variant, &body)
    }

    /// Start a streaming GET; the body is consumed by the caller.
    pub async fn open_download(&self, url: &str) -> Result<Response> {
        debug!("download: GET {url}");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| LauncherError::DownloadTransport(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LauncherError::DownloadTransport(format!("status error: {e}")))
    }
}

fn manifest_failure(message: String) -> LauncherError {
    warn!("manifest: {message}");
    LauncherError::ManifestFetch(message)
}

/// Parse a manifest body in the given shape. An empty listing is rejected.
pub fn parse_manifest(variant: ManifestVariant, body: &[u8]) -> Result<Manifest> {
    match variant {
        ManifestVariant::Catalog => {
            let doc: CatalogDocument = serde_json::from_slice(body)
                .map_err(|e| manifest_failure(format!("malformed catalog: {e}")))?;
            if doc.versions.is_empty() {
                return Err(manifest_failure("catalog lists no versions".into()));
            }
            Ok(Manifest::Catalog(Catalog::new(doc.versions)))
        }
        ManifestVariant::Latest => {
            let pointer: LatestPointer = serde_json::from_slice(body)
                .map_err(|e| manifest_failure(format!("malformed latest metadata: {e}")))?;
            if pointer.platforms.is_empty() {
                return Err(manifest_failure(format!(
                    "latest metadata for {} lists no platforms",
                    pointer.version
                )));
            }
            Ok(Manifest::Latest(pointer))
        }
    }
}
