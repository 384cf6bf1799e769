use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::pages::PageControl;
use crate::core::paths::{shared_minecraft_dir, GamePaths};
use crate::core::platform::OsKind;
use crate::core::version::AssetIndexRef;

const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetIndex {
    /// Old versions read assets by name rather than by hash.
    pub fn is_legacy(&self) -> bool {
        self.is_virtual || self.map_to_resources
    }
}

/// Where assets live. A shared store belongs to the official launcher and
/// is never written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetStore {
    pub root: PathBuf,
    pub shared: bool,
}

impl AssetStore {
    pub fn local(paths: &GamePaths) -> Self {
        Self {
            root: paths.assets_dir.clone(),
            shared: false,
        }
    }

    pub fn shared(os: OsKind) -> LauncherResult<Self> {
        let root = shared_minecraft_dir(os)
            .ok_or_else(|| {
                LauncherError::Assets("Cannot locate the shared game data directory.".into())
            })?
            .join("assets");
        Ok(Self { root, shared: true })
    }
}

/// Resolved asset layout used by the argument builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    pub index_id: String,
    /// `None` for legacy layouts, which only expose the virtual directory.
    pub assets_root: Option<PathBuf>,
    pub legacy_dir: PathBuf,
    pub legacy: bool,
    pub map_to_resources: bool,
}

/// Object hashes are SHA-1 hex digests; they double as path components.
fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

fn object_url(hash: &str) -> String {
    format!("{}/{}/{}", RESOURCES_URL, &hash[..2], hash)
}

/// Download the asset index and every object it lists that is missing.
pub async fn fetch_assets(
    downloader: &Downloader,
    paths: &GamePaths,
    store: &AssetStore,
    pages: &dyn PageControl,
    index_ref: &AssetIndexRef,
) -> LauncherResult<AssetLayout> {
    let index_path = store
        .root
        .join("indexes")
        .join(format!("{}.json", index_ref.id));

    if !tokio::fs::try_exists(&index_path).await.unwrap_or(false) {
        if store.shared {
            return Err(LauncherError::Assets(format!(
                "The shared assets directory is missing the index \"{}.json\".",
                index_ref.id
            )));
        }
        info!("Downloading asset index {}", index_ref.id);
        downloader
            .download_file(&index_ref.url, &index_path, index_ref.sha1.as_deref())
            .await
            .map_err(|e| {
                LauncherError::Assets(format!(
                    "Failed to download the asset index \"{}\": {e}",
                    index_ref.id
                ))
            })?;
    }

    let raw = tokio::fs::read_to_string(&index_path)
        .await
        .map_err(|e| {
            LauncherError::Assets(format!(
                "Error reading the asset index \"{}\": {e}",
                index_ref.id
            ))
        })?;
    let index: AssetIndex = serde_json::from_str(&raw).map_err(|e| {
        LauncherError::Assets(format!(
            "Error reading the asset index \"{}\": {e}",
            index_ref.id
        ))
    })?;

    let legacy_dir = store.root.join("virtual").join(&index_ref.id);
    let objects_dir = store.root.join("objects");

    let mut progress = pages.show_download_progress("Checking assets", index.objects.len());
    let mut fetched = 0usize;

    for (name, object) in &index.objects {
        progress.set_current(name);

        if !is_valid_hash(&object.hash) {
            return Err(LauncherError::Assets(format!(
                "Asset \"{name}\" has an invalid hash."
            )));
        }
        let dest = if index.is_legacy() {
            legacy_dir.join(name)
        } else {
            objects_dir.join(&object.hash[..2]).join(&object.hash)
        };

        if !tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            if store.shared {
                return Err(LauncherError::Assets(format!(
                    "The shared assets directory is missing \"{name}\"."
                )));
            }
            downloader
                .download_file(&object_url(&object.hash), &dest, Some(&object.hash))
                .await
                .map_err(|e| {
                    LauncherError::Assets(format!("Failed to download asset \"{name}\": {e}"))
                })?;
            fetched += 1;
        }

        progress.advance();
    }

    info!(
        "Assets ready: {} objects ({} downloaded)",
        index.objects.len(),
        fetched
    );

    if index.map_to_resources {
        if store.shared {
            return Err(LauncherError::Assets(
                "Shared assets can't be used with a version that maps assets to resources.".into(),
            ));
        }
        let source = legacy_dir.clone();
        let target = paths.game_dir.join("resources");
        debug!("Mapping assets to {:?}", target);
        tokio::task::spawn_blocking(move || copy_tree_missing(&source, &target))
            .await
            .map_err(|e| LauncherError::Internal(format!("Asset copy task failed: {e}")))??;
    }

    Ok(AssetLayout {
        index_id: index_ref.id.clone(),
        assets_root: if index.is_legacy() {
            None
        } else {
            Some(store.root.clone())
        },
        legacy_dir,
        legacy: index.is_legacy(),
        map_to_resources: index.map_to_resources,
    })
}

/// Recursively copy `source` into `target`, leaving existing files alone.
pub fn copy_tree_missing(source: &Path, target: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(target).map_err(|e| LauncherError::io(target, e))?;
    let entries = std::fs::read_dir(source).map_err(|e| LauncherError::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| LauncherError::io(source, e))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let kind = entry.file_type().map_err(|e| LauncherError::io(&from, e))?;
        if kind.is_dir() {
            copy_tree_missing(&from, &to)?;
        } else if !to.exists() {
            std::fs::copy(&from, &to).map_err(|e| LauncherError::io(&to, e))?;
        }
    }
    Ok(())
}
