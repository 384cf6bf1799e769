// ─── Natives ───
// Unpacks native libraries (.dll/.so/.dylib) from their jars.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

fn skipped(name: &str, exclude: &[String]) -> bool {
    name.starts_with("META-INF/")
        || name.ends_with(".git")
        || name.ends_with(".sha1")
        || exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
}

/// Extract `archive` into `target_dir`.
///
/// Skips directories, manifest metadata, VCS and detached-signature files
/// and every `exclude` prefix. Files already present are never overwritten.
/// Returns the number of files written.
pub fn extract_archive(archive: &Path, target_dir: &Path, exclude: &[String]) -> LauncherResult<usize> {
    let file = fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() || skipped(entry.name(), exclude) {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe entry {} in {:?}", entry.name(), archive);
            continue;
        };

        let dest = target_dir.join(relative);
        if dest.exists() {
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = fs::File::create(&dest).map_err(|e| LauncherError::io(&dest, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&dest, e))?;
        written += 1;
    }

    Ok(written)
}
