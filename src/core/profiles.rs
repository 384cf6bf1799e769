// ─── Profile Registry ───
// `launcher_profiles.json`, shared with the Forge and Fabric installers.
// Always read and written as a whole.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_version_id: Option<String>,
    /// Fields written by installers that this launcher doesn't interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRegistry {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn corrupted(e: impl std::fmt::Display) -> LauncherError {
    LauncherError::Profiles(format!("Corrupted \"launcher_profiles.json\": {e}"))
}

impl ProfileRegistry {
    /// `None` when the file doesn't exist yet.
    pub async fn load(path: &Path) -> LauncherResult<Option<Self>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LauncherError::io(path, e)),
        };
        let registry = serde_json::from_str(&raw).map_err(corrupted)?;
        Ok(Some(registry))
    }

    pub async fn store(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// Installers refuse to run without a registry file.
    pub async fn create_if_missing(path: &Path) -> LauncherResult<()> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(());
        }
        debug!("Creating empty profile registry at {:?}", path);
        ProfileRegistry::default().store(path).await
    }

    /// Version id registered under `key`, if any.
    pub async fn version_id(path: &Path, key: &str) -> LauncherResult<Option<String>> {
        Ok(Self::load(path)
            .await?
            .and_then(|registry| registry.profiles.get(key).cloned())
            .and_then(|profile| profile.last_version_id))
    }

    /// Register `version_id` under `key`, creating the file when needed.
    pub async fn register(path: &Path, key: &str, version_id: &str) -> LauncherResult<()> {
        let mut registry = Self::load(path).await?.unwrap_or_default();
        registry.profiles.insert(
            key.to_string(),
            Profile {
                name: Some(key.to_string()),
                last_version_id: Some(version_id.to_string()),
                extra: Default::default(),
            },
        );
        registry.store(path).await
    }

    /// Move the profile pointing at `version_id` under `stable_key`.
    /// Returns `false` when no profile points there.
    pub fn rename_to_stable(&mut self, version_id: &str, stable_key: &str) -> bool {
        let found = self
            .profiles
            .iter()
            .find(|(key, profile)| {
                key.as_str() != stable_key
                    && profile.last_version_id.as_deref() == Some(version_id)
            })
            .map(|(key, _)| key.clone());

        match found {
            Some(key) => {
                if let Some(mut profile) = self.profiles.remove(&key) {
                    profile.name = Some(stable_key.to_string());
                    self.profiles.insert(stable_key.to_string(), profile);
                }
                true
            }
            None => self.profiles.contains_key(stable_key),
        }
    }
}
