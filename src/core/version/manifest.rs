// ─── Version Manifest ───
// Local copy of the Mojang version manifest v2, revalidated with a
// conditional HEAD against the file's modification time.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Http;
use crate::core::paths::GamePaths;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level Mojang version manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub compliance_level: Option<u32>,
}

fn manifest_error(context: &str, error: impl std::fmt::Display) -> LauncherError {
    LauncherError::Manifest(format!("{context}: {error}"))
}

impl VersionManifest {
    /// Load the cached manifest, refreshing it first when the server has a
    /// newer copy. With `offline` an existing copy is used without asking.
    pub async fn load(http: &Http, paths: &GamePaths, offline: bool) -> LauncherResult<Self> {
        let path = paths.manifest_file();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            info!("Versions manifest not cached, downloading");
            Self::download(http, paths).await?;
        } else if !offline {
            let modified: DateTime<Utc> = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .map_err(|e| manifest_error("Cannot read the versions manifest timestamp", e))?
                .into();

            let status = http
                .head_if_modified_since(VERSION_MANIFEST_URL, modified)
                .await
                .map_err(|e| manifest_error("Cannot check the versions manifest", e))?;
            match status {
                200 => {
                    info!("Versions manifest changed on the server, downloading");
                    Self::download(http, paths).await?;
                }
                304 => debug!("Versions manifest is up to date"),
                other => {
                    return Err(LauncherError::Manifest(format!(
                        "Unexpected response while checking the versions manifest (HTTP {other})."
                    )))
                }
            }
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| manifest_error("Cannot read the versions manifest", e))?;
        let manifest: VersionManifest = serde_json::from_str(&raw)
            .map_err(|e| manifest_error("Error reading the versions manifest", e))?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    async fn download(http: &Http, paths: &GamePaths) -> LauncherResult<()> {
        let path = paths.manifest_file();
        let (text, date) = http
            .get_text_with_date(VERSION_MANIFEST_URL)
            .await
            .map_err(|e| manifest_error("Failed to download the versions manifest", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&path, text)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;

        // Stamp the server date so the next run can send If-Modified-Since.
        if let Some(date) = date {
            let file = std::fs::File::options()
                .write(true)
                .open(&path)
                .map_err(|e| LauncherError::io(&path, e))?;
            file.set_modified(SystemTime::from(date))
                .map_err(|e| LauncherError::io(&path, e))?;
        }
        Ok(())
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}
