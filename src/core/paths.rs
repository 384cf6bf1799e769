// ─── Paths ───
// Every location the pipeline touches, derived from one base directory.

use std::path::{Path, PathBuf};

use crate::core::platform::OsKind;

pub const BRIDGE_JAR_NAME: &str = "launcher-bridge.jar";
/// Prefix of the system properties read by the bridge classes.
pub const BRIDGE_PROPERTY_PREFIX: &str = "ironlaunch.launcher";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePaths {
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub game_dir: PathBuf,
    pub libraries_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub natives_root: PathBuf,
    pub assets_dir: PathBuf,
    pub forge_dir: PathBuf,
    pub fabric_dir: PathBuf,
    /// Java helper shipped with the launcher: property probe, installer
    /// patch, bytecode patcher and console wrapper.
    pub bridge_jar: PathBuf,
}

impl GamePaths {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let data_dir = base_dir.join("data");
        Self {
            game_dir: base_dir.join("game"),
            libraries_dir: data_dir.join("libraries"),
            versions_dir: data_dir.join("versions"),
            natives_root: data_dir.join("natives"),
            assets_dir: data_dir.join("assets"),
            forge_dir: base_dir.join("forge"),
            fabric_dir: base_dir.join("fabric"),
            bridge_jar: base_dir.join(BRIDGE_JAR_NAME),
            data_dir,
            base_dir,
        }
    }

    pub fn version_dir(&self, id: &str) -> PathBuf {
        self.versions_dir.join(id)
    }

    /// `versions/<id>/<id>.json`
    pub fn version_file(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.json"))
    }

    /// `versions/<id>/<id>.jar`
    pub fn client_jar(&self, id: &str) -> PathBuf {
        self.version_dir(id).join(format!("{id}.jar"))
    }

    pub fn natives_dir(&self, id: &str) -> PathBuf {
        self.natives_root.join(id)
    }

    pub fn library_path(&self, relative: &str) -> PathBuf {
        self.libraries_dir.join(relative)
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.data_dir.join("launcher_profiles.json")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.versions_dir.join("version_manifest_v2.json")
    }

    pub fn log_config(&self) -> PathBuf {
        self.base_dir.join("log4j.xml")
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("game.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    pub fn identity_file(&self) -> PathBuf {
        self.base_dir.join("login.dat")
    }

    pub fn token_cache_file(&self) -> PathBuf {
        self.base_dir.join("msa-auth.dat")
    }

    pub fn client_id_file(&self) -> PathBuf {
        self.base_dir.join("clientId.txt")
    }
}

/// Data directory of the official launcher, used by share mode and for
/// the shared client id.
pub fn shared_minecraft_dir(os: OsKind) -> Option<PathBuf> {
    match os {
        OsKind::Windows => dirs::data_dir().map(|d| d.join(".minecraft")),
        OsKind::Osx => dirs::data_dir().map(|d| d.join("minecraft")),
        OsKind::Linux => dirs::home_dir().map(|d| d.join(".minecraft")),
    }
}

/// Quote a path for a command line when it contains a space.
pub fn quote_if_spaced(value: &str) -> String {
    if value.contains(' ') {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
