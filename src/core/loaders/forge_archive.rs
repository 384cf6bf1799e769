// ─── Forge Archive Merge ───
// Old Forge builds ship as a universal (or client) zip meant to be pasted
// over the vanilla client jar. We do that merge into a new version.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::context::InstallContext;
use super::forge::ForgeVersion;
use crate::core::downloader::ArtifactFetcher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::profiles::ProfileRegistry;

/// `key=value` lines, `#` starts a comment.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| {
            let line = match line.find('#') {
                Some(i) => &line[..i],
                None => line,
            };
            let (key, value) = line.trim_start().split_once('=')?;
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

fn read_entry(zip: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Option<String> {
    let mut entry = zip.by_name(name).ok()?;
    let mut text = String::new();
    entry.read_to_string(&mut text).ok()?;
    Some(text)
}

async fn open_archive(path: &Path, invalid: &str) -> LauncherResult<zip::ZipArchive<Cursor<Vec<u8>>>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(|_| LauncherError::Forge(invalid.to_string()))
}

fn game_version(zip: &mut zip::ZipArchive<Cursor<Vec<u8>>>) -> LauncherResult<String> {
    let invalid = || LauncherError::Forge("Invalid Forge universal/client archive.".into());
    let props = parse_properties(&read_entry(zip, "fmlversion.properties").ok_or_else(invalid)?);
    props
        .get("fmlbuild.mcversion")
        .or_else(|| props.get("fmlbuild.mcclientversion"))
        .cloned()
        .ok_or_else(invalid)
}

/// `(game version, loader version)` embedded in a universal archive.
pub async fn read_universal_versions(path: &Path) -> LauncherResult<(String, String)> {
    const INVALID: &str = "Invalid Forge universal archive.";
    let mut zip = open_archive(path, INVALID).await?;
    let minecraft = game_version(&mut zip)?;

    let invalid = || LauncherError::Forge(INVALID.into());
    let props = parse_properties(&read_entry(&mut zip, "forgeversion.properties").ok_or_else(invalid)?);
    let part = |key: &str| props.get(key).cloned().ok_or_else(invalid);
    let forge = format!(
        "{}.{}.{}.{}",
        part("forge.major.number")?,
        part("forge.minor.number")?,
        part("forge.revision.number")?,
        part("forge.build.number")?
    );
    Ok((minecraft, forge))
}

/// `(game version, loader version)` embedded in a client archive.
pub async fn read_client_versions(path: &Path) -> LauncherResult<(String, String)> {
    const INVALID: &str = "Invalid Forge client archive.";
    let mut zip = open_archive(path, INVALID).await?;
    let minecraft = game_version(&mut zip)?;

    let invalid = || LauncherError::Forge(INVALID.into());
    let info: serde_json::Value =
        serde_json::from_str(&read_entry(&mut zip, "mod_MinecraftForge.info").ok_or_else(invalid)?)
            .map_err(|_| invalid())?;
    let forge = info
        .get(0)
        .and_then(|mod_info| mod_info.get("version"))
        .and_then(|v| v.as_str())
        .ok_or_else(invalid)?;
    Ok((minecraft, forge.to_string()))
}

/// Copy entries of `loader` then those of `vanilla` not already written.
/// `META-INF/` is dropped from both, which strips the vanilla signature.
pub fn merge_archives(loader: &Path, vanilla: &Path, output: &Path) -> LauncherResult<usize> {
    let open = |path: &Path| -> LauncherResult<zip::ZipArchive<File>> {
        let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
        Ok(zip::ZipArchive::new(file)?)
    };
    let mut loader_zip = open(loader)?;
    let mut vanilla_zip = open(vanilla)?;

    let out = File::create(output).map_err(|e| LauncherError::io(output, e))?;
    let mut writer = zip::ZipWriter::new(out);
    let mut written = HashSet::new();

    for archive in [&mut loader_zip, &mut vanilla_zip] {
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name().to_string();
            if name.starts_with("META-INF/") || written.contains(&name) {
                continue;
            }
            writer.raw_copy_file(entry)?;
            written.insert(name);
        }
    }

    writer.finish()?;
    Ok(written.len())
}

/// Build `<version_id>` from the vanilla client plus the loader archive and
/// register it under the stable profile key.
pub async fn install_by_merging(
    ctx: &InstallContext<'_>,
    version: &ForgeVersion,
    archive: &Path,
    version_id: &str,
) -> LauncherResult<()> {
    ctx.ensure_vanilla_cached(&version.minecraft)
        .await
        .map_err(|e| {
            LauncherError::Forge(format!(
                "Error fetching Minecraft {} for Forge: {e}",
                version.minecraft
            ))
        })?;
    let vanilla = ctx.resolver().resolve(&version.minecraft).await?;

    ArtifactFetcher::new(ctx.downloader, ctx.paths, ctx.pages)
        .fetch_client_artifact(&vanilla)
        .await?;

    let output = ctx.paths.client_jar(version_id);
    let dir = ctx.paths.version_dir(version_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| LauncherError::io(&dir, e))?;

    let scratch = dir.join(format!(".{version_id}.jar.part"));
    let loader = archive.to_path_buf();
    let vanilla_jar = vanilla.client_jar(ctx.paths);
    let target: PathBuf = scratch.clone();
    let merged = tokio::task::spawn_blocking(move || merge_archives(&loader, &vanilla_jar, &target))
        .await
        .map_err(|e| LauncherError::Internal(format!("Archive merge task failed: {e}")))?;
    let merged = match merged {
        Ok(count) => count,
        Err(e) => {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(LauncherError::Forge(format!("Error merging the Forge archive: {e}")));
        }
    };
    tokio::fs::rename(&scratch, &output)
        .await
        .map_err(|e| LauncherError::Forge(format!("Error writing \"{version_id}.jar\": {e}")))?;
    debug!("Merged {} entries into {:?}", merged, output);

    write_cloned_version_file(ctx, &vanilla.id, version_id)
        .await
        .map_err(|_| LauncherError::Forge("Error creating version file.".into()))?;

    ProfileRegistry::register(&ctx.paths.profiles_file(), &version.profile_key(), version_id)
        .await
        .map_err(|_| LauncherError::Forge("Error updating profiles.".into()))?;

    info!("Forge {} installed as {}", version.full, version_id);
    Ok(())
}

async fn write_cloned_version_file(
    ctx: &InstallContext<'_>,
    vanilla_id: &str,
    version_id: &str,
) -> LauncherResult<()> {
    let source = ctx.paths.version_file(vanilla_id);
    let raw = tokio::fs::read_to_string(&source)
        .await
        .map_err(|e| LauncherError::io(&source, e))?;
    let mut json: serde_json::Value = serde_json::from_str(&raw)?;
    let object = json
        .as_object_mut()
        .ok_or_else(|| LauncherError::VersionFile(format!("\"{vanilla_id}.json\" is not an object.")))?;
    object.insert("id".into(), serde_json::Value::String(version_id.to_string()));

    let target = ctx.paths.version_file(version_id);
    tokio::fs::write(&target, serde_json::to_string(&json)?)
        .await
        .map_err(|e| LauncherError::io(&target, e))
}
