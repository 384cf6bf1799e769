// ─── Forge ───
// Version parsing, input artifact detection and the installed-profile
// lookup. The actual install work lives in `forge_installer` (installer
// jar) and `forge_archive` (universal/client archive merge).

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use super::context::InstallContext;
use super::forge_archive;
use super::forge_installer;
use super::installer::LoaderInstaller;
use crate::core::assets::asset_index::copy_tree_missing;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::profiles::ProfileRegistry;

/// `<game>-<major>.<minor>.<patch>[.<build>]`, e.g. `1.12.2-14.23.5.2859`.
pub const FORGE_VERSION_PATTERN: &str =
    r"^(([1-9]+)\.([0-9]+)(\.([0-9]+))?)-(([0-9]+)\.([0-9]+)\.([0-9]+)(\.([0-9]+))?)$";

static FORGE_VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FORGE_VERSION_PATTERN).expect("Invalid regex"));

/// Game versions that need the FML libraries copied by hand; their
/// download links are dead.
const FML_LIBS_VERSIONS: &[&str] = &[
    "1.3.2", "1.4", "1.4.1", "1.4.2", "1.4.3", "1.4.4", "1.4.5", "1.4.6", "1.4.7", "1.5", "1.5.1",
    "1.5.2",
];

/// The only client archive that ships with FML built in.
const CLIENT_ARCHIVE_VERSION: &str = "1.2.5";

/// A requested Forge version, as written in the game configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeVersion {
    /// The string as given.
    pub full: String,
    /// Game version with a zero revision dropped: `1.4.0` is `1.4`.
    pub minecraft: String,
    /// `<major>.<minor>.<patch>[.<build>]`
    pub forge: String,
}

impl ForgeVersion {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let caps = FORGE_VERSION_REGEX
            .captures(raw)
            .ok_or_else(|| LauncherError::Forge("Incorrect Forge version format.".into()))?;

        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
        let revision: u32 = group(5).parse().unwrap_or(0);
        let minecraft = if revision == 0 {
            format!("{}.{}", group(2), group(3))
        } else {
            group(1).to_string()
        };

        Ok(Self {
            full: raw.to_string(),
            minecraft,
            forge: group(6).to_string(),
        })
    }

    /// Stable registry key this launcher files the install under.
    pub fn profile_key(&self) -> String {
        format!("forge--{}", self.full)
    }
}

/// Input artifact found in the `forge` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForgeSource {
    Installer { path: PathBuf, version_id: String },
    Universal { path: PathBuf, version_id: String },
    Client { path: PathBuf, version_id: String },
}

/// Files in `dir` ending with `suffix` whose name mentions `full`, sorted.
async fn candidates(dir: &Path, suffix: &str, full: &str) -> LauncherResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(suffix) && name.contains(full) && entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

fn archive_mismatch() -> LauncherError {
    LauncherError::Forge("The universal archive version doesn't match its file name.".into())
}

/// Find the first usable input: installer jar, then universal archive, then
/// client archive. Each candidate's embedded versions must agree with the
/// requested one before it is accepted.
pub async fn detect_source(forge_dir: &Path, version: &ForgeVersion) -> LauncherResult<ForgeSource> {
    if !tokio::fs::try_exists(forge_dir).await.unwrap_or(false) {
        return Err(LauncherError::Forge(
            "The directory \"forge\" is missing.".into(),
        ));
    }

    if let Some(path) = candidates(forge_dir, "-installer.jar", &version.full)
        .await?
        .into_iter()
        .next()
    {
        let (minecraft, version_id) = forge_installer::read_installer_versions(&path).await?;
        // Installer ids embed the loader version in varying shapes.
        if minecraft != version.minecraft || !version_id.contains(&version.forge) {
            return Err(LauncherError::Forge(
                "The installer version doesn't match its file name.".into(),
            ));
        }
        return Ok(ForgeSource::Installer { path, version_id });
    }

    if let Some(path) = candidates(forge_dir, "-universal.zip", &version.full)
        .await?
        .into_iter()
        .next()
    {
        let (minecraft, forge) = forge_archive::read_universal_versions(&path).await?;
        if minecraft != version.minecraft || forge != version.forge {
            return Err(archive_mismatch());
        }
        let version_id = format!("{minecraft}-forge-{forge}");
        return Ok(ForgeSource::Universal { path, version_id });
    }

    if let Some(path) = candidates(forge_dir, "-client.zip", &version.full)
        .await?
        .into_iter()
        .next()
    {
        if version.minecraft != CLIENT_ARCHIVE_VERSION {
            return Err(LauncherError::Forge(format!(
                "Unsupported client archive version {}.",
                version.minecraft
            )));
        }
        let (minecraft, forge) = forge_archive::read_client_versions(&path).await?;
        if minecraft != version.minecraft || forge != version.forge {
            return Err(archive_mismatch());
        }
        let version_id = format!("{minecraft}-forge-{forge}");
        return Ok(ForgeSource::Client { path, version_id });
    }

    Err(LauncherError::Forge(
        "Couldn't find the required Forge installer jar, universal zip archive or client zip archive file."
            .into(),
    ))
}

pub struct ForgeInstaller {
    version: ForgeVersion,
}

impl ForgeInstaller {
    pub fn new(version: &str) -> LauncherResult<Self> {
        Ok(Self {
            version: ForgeVersion::parse(version)?,
        })
    }

    pub fn version(&self) -> &ForgeVersion {
        &self.version
    }

    /// Old versions expect the FML libraries under `game/lib`.
    pub async fn copy_fml_libs_if_required(&self, ctx: &InstallContext<'_>) -> LauncherResult<()> {
        if !FML_LIBS_VERSIONS.contains(&self.version.minecraft.as_str()) {
            return Ok(());
        }
        let source = ctx.paths.forge_dir.join("fmllibs");
        let target = ctx.paths.game_dir.join("lib");
        debug!("Copying FML libraries into {:?}", target);
        tokio::task::spawn_blocking(move || copy_tree_missing(&source, &target))
            .await
            .map_err(|e| LauncherError::Internal(format!("FML library copy failed: {e}")))?
            .map_err(|e| LauncherError::Forge(format!("Error copying the FML libraries: {e}")))
    }
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn installed_version_id(&self, ctx: &InstallContext<'_>) -> LauncherResult<Option<String>> {
        ProfileRegistry::version_id(&ctx.paths.profiles_file(), &self.version.profile_key()).await
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<String> {
        info!("Installing Forge {}", self.version.full);
        ctx.pages.show_wait("Installing Forge...");

        match detect_source(&ctx.paths.forge_dir, &self.version).await? {
            ForgeSource::Installer { path, version_id } => {
                forge_installer::install_with_installer(ctx, &self.version, &path, &version_id)
                    .await?;
            }
            ForgeSource::Universal { path, version_id }
            | ForgeSource::Client { path, version_id } => {
                forge_archive::install_by_merging(ctx, &self.version, &path, &version_id).await?;
            }
        }

        self.installed_version_id(ctx).await?.ok_or_else(|| {
            LauncherError::Forge("The Forge installation didn't complete successfully.".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{temp_dir, write_file, write_zip};

    #[test]
    fn parses_game_and_loader_parts() {
        let v = ForgeVersion::parse("1.12.2-14.23.5.2859").unwrap();
        assert_eq!(v.minecraft, "1.12.2");
        assert_eq!(v.forge, "14.23.5.2859");
        assert_eq!(v.profile_key(), "forge--1.12.2-14.23.5.2859");

        let v = ForgeVersion::parse("1.4.0-6.6.2").unwrap();
        assert_eq!(v.minecraft, "1.4");
        assert_eq!(v.forge, "6.6.2");

        let v = ForgeVersion::parse("1.20-46.0.14").unwrap();
        assert_eq!(v.minecraft, "1.20");
    }

    #[test]
    fn rejects_malformed_versions() {
        for raw in ["1.12.2", "forge-1.12.2-14.23.5.2859", "0.1-1.2.3", "1.12.2-14.23"] {
            let err = ForgeVersion::parse(raw).unwrap_err();
            assert_eq!(err.to_string(), "Incorrect Forge version format.");
        }
    }

    #[tokio::test]
    async fn missing_forge_dir_is_reported() {
        let dir = temp_dir("forge-nodir");
        let version = ForgeVersion::parse("1.12.2-14.23.5.2859").unwrap();
        let err = detect_source(&dir.join("forge"), &version).await.unwrap_err();
        assert_eq!(err.to_string(), "The directory \"forge\" is missing.");
    }

    #[tokio::test]
    async fn nothing_found_names_all_strategies() {
        let dir = temp_dir("forge-empty");
        write_file(&dir.join("forge-1.7.10-10.13.4.1614-installer.jar"), b"");
        let version = ForgeVersion::parse("1.12.2-14.23.5.2859").unwrap();
        let err = detect_source(&dir, &version).await.unwrap_err();
        assert!(err.to_string().contains("installer jar, universal zip archive or client zip"));
    }

    #[tokio::test]
    async fn installer_is_preferred_and_checked() {
        let dir = temp_dir("forge-detect");
        write_zip(
            &dir.join("forge-1.12.2-14.23.5.2859-installer.jar"),
            &[(
                "install_profile.json",
                br#"{"version": "1.12.2-forge-14.23.5.2859", "minecraft": "1.12.2"}"#,
            )],
        );
        write_zip(
            &dir.join("forge-1.12.2-14.23.5.2859-universal.zip"),
            &[("fmlversion.properties", b"fmlbuild.mcversion=1.12.2\n")],
        );
        let version = ForgeVersion::parse("1.12.2-14.23.5.2859").unwrap();

        let source = detect_source(&dir, &version).await.unwrap();
        assert_eq!(
            source,
            ForgeSource::Installer {
                path: dir.join("forge-1.12.2-14.23.5.2859-installer.jar"),
                version_id: "1.12.2-forge-14.23.5.2859".into(),
            }
        );
    }

    #[tokio::test]
    async fn installer_for_another_game_version_is_rejected() {
        let dir = temp_dir("forge-installer-mismatch");
        write_zip(
            &dir.join("forge-1.12.2-14.23.5.2859-installer.jar"),
            &[(
                "install_profile.json",
                br#"{"install": {"minecraft": "1.12.1"}, "versionInfo": {"id": "1.12.1-forge1.12.1-14.23.5.2859"}}"#,
            )],
        );
        let version = ForgeVersion::parse("1.12.2-14.23.5.2859").unwrap();
        let err = detect_source(&dir, &version).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "The installer version doesn't match its file name."
        );
    }

    #[tokio::test]
    async fn client_archive_only_for_its_game_version() {
        let dir = temp_dir("forge-client");
        write_zip(
            &dir.join("minecraftforge-1.2.4-2.0.0-client.zip"),
            &[("fmlversion.properties", b"fmlbuild.mcclientversion=1.2.4\n")],
        );
        let version = ForgeVersion::parse("1.2.4-2.0.0").unwrap();
        let err = detect_source(&dir, &version).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported client archive version 1.2.4.");

        write_zip(
            &dir.join("minecraftforge-1.2.5-3.4.9.171-client.zip"),
            &[
                ("fmlversion.properties", b"fmlbuild.mcclientversion=1.2.5\n".as_slice()),
                ("mod_MinecraftForge.info", br#"[{"modid": "Forge", "version": "3.4.9.171"}]"#),
            ],
        );
        let version = ForgeVersion::parse("1.2.5-3.4.9.171").unwrap();
        let source = detect_source(&dir, &version).await.unwrap();
        assert!(matches!(
            source,
            ForgeSource::Client { ref version_id, .. } if version_id == "1.2.5-forge-3.4.9.171"
        ));
    }
}
