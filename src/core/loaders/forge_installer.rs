// ─── Forge Installer Jar ───
// Runs the official installer headlessly through the bridge patch class,
// then repairs what it leaves behind and files the profile under our key.

use std::io::{Cursor, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::context::InstallContext;
use super::forge::ForgeVersion;
use super::patcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::{path_str, BRIDGE_PROPERTY_PREFIX};
use crate::core::process::ToolCommand;
use crate::core::profiles::ProfileRegistry;

/// Game versions whose installers are broken upstream.
const INSTALLER_BLACKLIST: &[&str] = &["1.5.2"];

const INSTALLER_PATCH_CLASS: &str = "ironlaunch.bridge.ForgeInstallerPatch";

/// Exit code of the patch class when it can't hook this installer.
const EXIT_INCOMPATIBLE_PATCH: i32 = 2;

/// Both historical shapes of `install_profile.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallProfile {
    version: Option<String>,
    minecraft: Option<String>,
    install: Option<LegacyInstall>,
    version_info: Option<LegacyVersionInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyInstall {
    minecraft: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyVersionInfo {
    id: Option<String>,
}

fn invalid_installer() -> LauncherError {
    LauncherError::Forge("Invalid forge installer.".into())
}

/// `(game version, version id)` declared by an installer jar.
pub async fn read_installer_versions(path: &Path) -> LauncherResult<(String, String)> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|_| invalid_installer())?;
    let mut raw = String::new();
    zip.by_name("install_profile.json")
        .map_err(|_| invalid_installer())?
        .read_to_string(&mut raw)
        .map_err(|_| invalid_installer())?;
    let profile: InstallProfile = serde_json::from_str(&raw).map_err(|_| invalid_installer())?;

    match profile {
        InstallProfile {
            version: Some(id),
            minecraft: Some(minecraft),
            ..
        } => Ok((minecraft, id)),
        InstallProfile {
            version: None,
            install: Some(LegacyInstall {
                minecraft: Some(minecraft),
            }),
            version_info: Some(LegacyVersionInfo { id: Some(id) }),
            ..
        } => Ok((minecraft, id)),
        _ => Err(invalid_installer()),
    }
}

pub async fn install_with_installer(
    ctx: &InstallContext<'_>,
    version: &ForgeVersion,
    installer: &Path,
    version_id: &str,
) -> LauncherResult<()> {
    if INSTALLER_BLACKLIST.contains(&version.minecraft.as_str()) {
        return Err(LauncherError::Forge(format!(
            "The Forge installer for Minecraft version {} is not supported. Please use the universal archive instead.",
            version.minecraft
        )));
    }
    if ctx.java.major < 8 {
        return Err(LauncherError::Forge(
            "Running the Forge installer requires at least Java 8.".into(),
        ));
    }

    let profiles_file = ctx.paths.profiles_file();
    ProfileRegistry::create_if_missing(&profiles_file).await?;

    let classpath = format!(
        "{}{}{}",
        path_str(&ctx.paths.bridge_jar),
        ctx.platform.path_separator(),
        path_str(installer)
    );
    let command = ToolCommand::new(&ctx.java.path)
        .arg(format!(
            "-D{BRIDGE_PROPERTY_PREFIX}.path={}",
            path_str(&ctx.paths.data_dir)
        ))
        .arg(format!("-D{BRIDGE_PROPERTY_PREFIX}.choice=client"))
        .arg("-cp")
        .arg(classpath)
        .arg(INSTALLER_PATCH_CLASS)
        .current_dir(&ctx.paths.forge_dir);

    info!("Running Forge installer {:?}", installer.file_name());
    let output = ctx
        .tools
        .run(&command)
        .await
        .map_err(|_| LauncherError::Forge("Error running Forge installer.".into()))?;
    match output.code {
        Some(0) => {}
        Some(EXIT_INCOMPATIBLE_PATCH) => {
            return Err(LauncherError::Forge(
                "Forge installer incompatible with launcher patch.".into(),
            ))
        }
        code => {
            warn!("Forge installer exited with {:?}: {}", code, output.stderr.trim());
            return Err(LauncherError::Forge("Error running Forge installer.".into()));
        }
    }

    let version_file = ctx.paths.version_file(version_id);
    complete_version_file(ctx, version, &version_file)
        .await
        .map_err(|e| {
            warn!("Could not complete {:?}: {}", version_file, e);
            LauncherError::Forge("Error while adding missing version info.".into())
        })?;

    patcher::patch_if_required(ctx, version, version_id, &version_file).await?;

    let not_completed =
        || LauncherError::Forge("The Forge installation didn't complete successfully.".into());
    let mut registry = ProfileRegistry::load(&profiles_file)
        .await?
        .ok_or_else(not_completed)?;
    if !registry.rename_to_stable(version_id, &version.profile_key()) {
        return Err(not_completed());
    }
    registry.store(&profiles_file).await?;

    info!("Forge {} installed as {}", version.full, version_id);
    Ok(())
}

/// Some installers write stray `,` lines; drop them and reparse.
async fn parse_repairing(path: &Path) -> LauncherResult<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    if let Ok(json) = serde_json::from_str(&raw) {
        return Ok(json);
    }

    let repaired = raw
        .lines()
        .filter(|line| *line != ",")
        .collect::<Vec<_>>()
        .join("\n");
    tokio::fs::write(path, &repaired)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(serde_json::from_str(&repaired)?)
}

/// Older installers omit `assetIndex`; borrow the vanilla one.
async fn complete_version_file(
    ctx: &InstallContext<'_>,
    version: &ForgeVersion,
    path: &Path,
) -> LauncherResult<()> {
    let mut json = parse_repairing(path).await?;
    let object = json
        .as_object_mut()
        .ok_or_else(|| LauncherError::VersionFile("The version file is not an object.".into()))?;
    if object.contains_key("assetIndex") {
        return Ok(());
    }

    ctx.ensure_vanilla_cached(&version.minecraft).await?;
    let vanilla_path = ctx.paths.version_file(&version.minecraft);
    let vanilla_raw = tokio::fs::read_to_string(&vanilla_path)
        .await
        .map_err(|e| LauncherError::io(&vanilla_path, e))?;
    let vanilla: serde_json::Value = serde_json::from_str(&vanilla_raw)?;
    let asset_index = vanilla.get("assetIndex").cloned().ok_or_else(|| {
        LauncherError::VersionFile(format!("\"{}.json\" has no asset info.", version.minecraft))
    })?;

    object.insert("assetIndex".into(), asset_index);
    tokio::fs::write(path, serde_json::to_string(&json)?)
        .await
        .map_err(|e| LauncherError::io(path, e))
}
