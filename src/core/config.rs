// ─── Configuration ───
// `game.json` describes what to launch and ships with the game.
// `settings.json` holds the user's own tweaks and can be saved back.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::{ForgeVersion, ModLoaderRequest};
use crate::core::paths::{shared_minecraft_dir, GamePaths};
use crate::core::platform::OsKind;

pub const DEFAULT_TITLE: &str = "Ironlaunch";

/// Heap and GC flags used until the user sets their own.
pub const VM_DEFAULTS: &str = "-Xmx2G -XX:+UnlockExperimentalVMOptions -XX:+UseG1GC -XX:G1NewSizePercent=20 -XX:G1ReservePercent=20 -XX:MaxGCPauseMillis=50 -XX:G1HeapRegionSize=32M";

const CLIENT_ID_FILE: &str = "clientId.txt";

// ── Game config ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(rename = "index")]
    pub id: String,
    pub url: String,
}

/// Free-form templates used instead of a version file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    #[serde(default)]
    pub vm_args: String,
    #[serde(default)]
    pub main_class: String,
    #[serde(default)]
    pub game_args: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub name: String,
    /// Relative to the base directory, which it may not leave.
    #[serde(default)]
    pub lock_file: Option<String>,
    /// Used when the user didn't pick a Java binary. Accepts `${os}` and `${arch}`.
    #[serde(default)]
    pub java_bin: Option<String>,
    #[serde(default)]
    pub assets: Option<AssetConfig>,
    /// Read assets from the official launcher's directory.
    #[serde(default)]
    pub share_assets: bool,
    /// Azure application id, overriding the one built in.
    #[serde(default)]
    pub azure_client_id: Option<String>,
    #[serde(default)]
    pub launch_args: Option<LaunchArgs>,
    #[serde(default)]
    pub launch_version: Option<String>,
    #[serde(default)]
    pub launch_forge: Option<String>,
    #[serde(default)]
    pub launch_fabric: Option<String>,
}

/// What a launch attempt starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    Args(LaunchArgs),
    Version(String),
    Loader(ModLoaderRequest),
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl GameConfig {
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            warn!("Cannot read {:?}: {e}", path);
            LauncherError::Config("Error loading game launch configuration.".into())
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            warn!("Cannot parse {:?}: {e}", path);
            LauncherError::Config("Error loading game launch configuration.".into())
        })?;
        let config = config.normalized()?;
        config.validate()?;
        debug!("Loaded game config \"{}\"", config.name);
        Ok(config)
    }

    /// Trim every value and drop empty ones.
    pub fn normalized(mut self) -> LauncherResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            self.name = DEFAULT_TITLE.into();
        }
        self.lock_file = trimmed(self.lock_file);
        self.java_bin = trimmed(self.java_bin);
        self.azure_client_id = trimmed(self.azure_client_id);

        self.assets = self.assets.and_then(|a| {
            let id = a.id.trim().to_string();
            let url = a.url.trim().to_string();
            (!id.is_empty() && !url.is_empty()).then_some(AssetConfig { id, url })
        });

        if let Some(args) = self.launch_args.as_mut() {
            args.vm_args = args.vm_args.trim().to_string();
            args.main_class = args.main_class.trim().to_string();
            args.game_args = args.game_args.trim().to_string();
        }

        self.launch_version = self.launch_version.map(|v| v.trim().to_string());
        self.launch_fabric = self.launch_fabric.map(|v| v.trim().to_string());
        self.launch_forge = self.launch_forge.map(|v| v.trim().to_string());
        if let Some(forge) = &self.launch_forge {
            ForgeVersion::parse(forge)
                .map_err(|_| LauncherError::Config("Incorrect launch_forge format.".into()))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> LauncherResult<()> {
        let targets = [
            self.launch_args.is_some(),
            self.launch_version.is_some(),
            self.launch_forge.is_some(),
            self.launch_fabric.is_some(),
        ];
        if targets.iter().filter(|set| **set).count() != 1 {
            return Err(LauncherError::Config(
                "Either launch_args, launch_version, launch_forge or launch_fabric must be set in the game config, but no more than one of those."
                    .into(),
            ));
        }

        if let Some(args) = &self.launch_args {
            for (value, key) in [
                (&args.vm_args, "vm_args"),
                (&args.main_class, "main_class"),
                (&args.game_args, "game_args"),
            ] {
                if value.is_empty() {
                    return Err(LauncherError::Config(format!(
                        "The game setting launch_args requires a sub setting {key}."
                    )));
                }
            }
            return Ok(());
        }

        if self.assets.is_some() {
            let target = if self.launch_version.is_some() {
                "launch_version"
            } else if self.launch_forge.is_some() {
                "launch_forge"
            } else {
                "launch_fabric"
            };
            return Err(LauncherError::Config(format!(
                "The game settings {target} and assets are mutually exclusive."
            )));
        }
        Ok(())
    }

    pub fn target(&self) -> LauncherResult<LaunchTarget> {
        if let Some(args) = &self.launch_args {
            return Ok(LaunchTarget::Args(args.clone()));
        }
        if let Some(version) = &self.launch_version {
            return Ok(LaunchTarget::Version(version.clone()));
        }
        if let Some(forge) = &self.launch_forge {
            return Ok(LaunchTarget::Loader(ModLoaderRequest::Forge(forge.clone())));
        }
        if let Some(fabric) = &self.launch_fabric {
            return Ok(LaunchTarget::Loader(ModLoaderRequest::Fabric(fabric.clone())));
        }
        Err(LauncherError::Internal("The game config has no launch target.".into()))
    }

    /// Absolute lock file path, refused when it points outside `base_dir`.
    pub fn lock_path(&self, base_dir: &Path) -> LauncherResult<Option<PathBuf>> {
        let Some(raw) = &self.lock_file else {
            return Ok(None);
        };
        let path = normalize(&base_dir.join(raw));
        if !path.starts_with(normalize(base_dir)) {
            return Err(LauncherError::Config(
                "The lock file is located outside of the current directory".into(),
            ));
        }
        Ok(Some(path))
    }
}

/// Resolve `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ── User settings ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Empty means "use the game config or `java`".
    #[serde(rename = "jvm_bin", default)]
    pub java_bin: String,
    #[serde(rename = "jre_args", default = "default_jre_args")]
    pub jre_args: String,
    #[serde(default = "default_close_on_exit")]
    pub close_on_exit: bool,
}

fn default_jre_args() -> String {
    VM_DEFAULTS.to_string()
}

fn default_close_on_exit() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            java_bin: String::new(),
            jre_args: default_jre_args(),
            close_on_exit: default_close_on_exit(),
        }
    }
}

impl Settings {
    /// Missing or corrupt settings fall back to the defaults.
    pub async fn load(path: &Path) -> Self {
        let Ok(raw) = tokio::fs::read_to_string(path).await else {
            return Self::default();
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(mut settings) => {
                settings.java_bin = settings.java_bin.trim().to_string();
                settings.jre_args = settings.jre_args.trim().to_string();
                settings
            }
            Err(e) => {
                warn!("Ignoring corrupt settings {:?}: {e}", path);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| LauncherError::io(path, e))
    }

    /// The Java binary to probe: settings, then the game config template,
    /// then `java` from `PATH`.
    pub fn java_binary(&self, config: &GameConfig) -> Option<String> {
        if !self.java_bin.is_empty() {
            return Some(self.java_bin.clone());
        }
        config.java_bin.clone()
    }
}

// ── Client id ───────────────────────────────────────────

/// Client id handed to the game (not the Azure application id). Reuses
/// the official launcher's when readable, else a local one, else a new one.
pub async fn resolve_client_id(paths: &GamePaths, os: OsKind) -> LauncherResult<String> {
    if let Some(shared) = shared_minecraft_dir(os) {
        if let Ok(id) = tokio::fs::read_to_string(shared.join(CLIENT_ID_FILE)).await {
            let id = id.trim();
            if !id.is_empty() {
                debug!("Using the official launcher's client id");
                return Ok(id.to_string());
            }
        }
    }
    local_client_id(&paths.client_id_file()).await
}

async fn local_client_id(path: &Path) -> LauncherResult<String> {
    if let Ok(raw) = tokio::fs::read_to_string(path).await {
        if let Ok(id) = uuid::Uuid::parse_str(raw.trim()) {
            return Ok(id.to_string());
        }
    }
    let id = uuid::Uuid::new_v4().to_string();
    tokio::fs::write(path, &id)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    info!("Generated a new client id");
    Ok(id)
}
