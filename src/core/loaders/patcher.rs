// ─── Bytecode Patcher ───
// A few Forge builds crash on current JVMs. The bridge carries BCEL
// patches for them, applied in place to the installed library.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use super::context::InstallContext;
use super::forge::ForgeVersion;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::path_str;
use crate::core::process::ToolCommand;

const PATCHER_CLASS: &str = "ironlaunch.bridge.BytecodePatcher";
const PATCHER_CLASSPATH: &[&str] = &["commons-lang3-3.12.0.jar", "bcel-6.6.0.jar"];

/// Unstable sort in `CoreModManager`.
const SORT_PATCH_VERSIONS: &[&str] = &["1.7.2-10.12.2.1161"];
/// `ManifestEntryVerifier` touching removed `sun.*` internals.
const SUN_PATCH_VERSIONS: &[&str] = &["1.16.3-34.1.42", "1.16.4-35.1.4", "1.16.4-35.1.37"];

static MODLAUNCHER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"modlauncher-(\d+\.\d+\.\d+).jar").expect("Invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytecodePatch {
    pub name: &'static str,
    /// Library rewritten in place.
    pub target: PathBuf,
}

/// Patch needed by `version`, if any, with the library it applies to.
pub async fn required_patch(
    ctx: &InstallContext<'_>,
    version: &ForgeVersion,
    version_id: &str,
    version_file: &Path,
) -> LauncherResult<Option<BytecodePatch>> {
    if SORT_PATCH_VERSIONS.contains(&version.full.as_str()) {
        let suffix = version_id
            .rfind('-')
            .map(|i| &version_id[i..])
            .unwrap_or_default();
        let name = format!("{}{}", version.full, suffix);
        let target = ctx
            .paths
            .libraries_dir
            .join("net/minecraftforge/forge")
            .join(&name)
            .join(format!("forge-{name}.jar"));
        return Ok(Some(BytecodePatch {
            name: "CoreModManager_Sort_Patch",
            target,
        }));
    }

    if SUN_PATCH_VERSIONS.contains(&version.full.as_str()) {
        let raw = tokio::fs::read_to_string(version_file)
            .await
            .map_err(|e| LauncherError::io(version_file, e))?;
        let modlauncher = MODLAUNCHER_REGEX
            .captures(&raw)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| LauncherError::Forge("Patching failed.".into()))?;
        let target = ctx
            .paths
            .libraries_dir
            .join("cpw/mods/modlauncher")
            .join(&modlauncher)
            .join(format!("modlauncher-{modlauncher}.jar"));
        return Ok(Some(BytecodePatch {
            name: "SecureJarHandler_ManifestEntryVerifier_Patch",
            target,
        }));
    }

    Ok(None)
}

pub async fn patch_if_required(
    ctx: &InstallContext<'_>,
    version: &ForgeVersion,
    version_id: &str,
    version_file: &Path,
) -> LauncherResult<()> {
    let Some(patch) = required_patch(ctx, version, version_id, version_file).await? else {
        return Ok(());
    };

    if ctx.java.major < 7 {
        return Err(LauncherError::Forge(
            "Running the bytecode patcher requires at least Java 7.".into(),
        ));
    }
    if !tokio::fs::try_exists(&patch.target).await.unwrap_or(false) {
        return Err(LauncherError::Forge(
            "A patch is required for this version of Forge but the launcher can't find the file that needs patching."
                .into(),
        ));
    }

    let separator = ctx.platform.path_separator().to_string();
    let classpath = PATCHER_CLASSPATH
        .iter()
        .map(|jar| path_str(&ctx.paths.base_dir.join(jar)))
        .chain(std::iter::once(path_str(&ctx.paths.bridge_jar)))
        .collect::<Vec<_>>()
        .join(&separator);

    info!("Applying {} to {:?}", patch.name, patch.target);
    let command = ToolCommand::new(&ctx.java.path)
        .arg("-cp")
        .arg(classpath)
        .arg(PATCHER_CLASS)
        .arg(patch.name)
        .arg(path_str(&patch.target))
        .current_dir(&ctx.paths.base_dir);

    let output = ctx.tools.run(&command).await?;
    if !output.success() {
        return Err(LauncherError::Forge("Patching the bytecode failed.".into()));
    }
    Ok(())
}
