use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::hash;
use crate::core::http::Http;

/// Sequential, SHA-1 validated downloader.
///
/// Bytes are verified in memory, written to a scratch file next to the
/// destination and renamed into place, so a failed download never leaves
/// anything at the final path.
#[derive(Clone)]
pub struct Downloader {
    http: Http,
}

/// Scratch file removed on drop unless committed.
struct ScratchFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn scratch_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.part"))
}

impl Downloader {
    pub fn new(http: Http) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &Http {
        &self.http
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, verifying `sha1_expected` when declared.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let bytes = self.http.get_bytes(url).await?;

        if let Some(expected) = sha1_expected {
            hash::verify_sha1(&bytes, expected, dest)?;
        }

        let mut scratch = ScratchFile {
            path: scratch_path(dest),
            committed: false,
        };
        tokio::fs::write(&scratch.path, &bytes)
            .await
            .map_err(|e| LauncherError::io(&scratch.path, e))?;
        tokio::fs::rename(&scratch.path, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        scratch.committed = true;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    /// Download only when `dest` is absent. Files already on disk are
    /// trusted as-is. Returns whether a download happened.
    pub async fn download_if_missing(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<bool> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Ok(false);
        }
        self.download_file(url, dest, sha1_expected).await?;
        Ok(true)
    }
}
