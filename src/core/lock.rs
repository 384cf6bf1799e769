// ─── Lock File ───
// Keeps a second launcher from working on the same files. The lock is an
// exclusive OS file lock held until `unlock` or drop. Shared by reference
// so the launch step can release it right before the game starts.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl LockFile {
    /// Open (creating it if needed) and lock `path`. Returns `Ok(None)`
    /// when another process already holds it.
    pub fn acquire(path: &Path) -> LauncherResult<Option<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| LauncherError::io(path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Locked {:?}", path);
                Ok(Some(Self {
                    path: path.to_path_buf(),
                    file: Mutex::new(Some(file)),
                }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(LauncherError::io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_locked(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the lock. Calling it again does nothing.
    pub fn unlock(&self) {
        let taken = self.file.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(file) = taken {
            if let Err(e) = FileExt::unlock(&file) {
                warn!("Could not release {:?}: {e}", self.path);
            }
            debug!("Unlocked {:?}", self.path);
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        self.unlock();
    }
}
