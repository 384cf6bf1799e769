use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::LoginIdentity;
use crate::core::crypto::{Cipher, Compressor};
use crate::core::error::{LauncherError, LauncherResult};

/// The last signed-in identity, kept so the game can start offline.
/// On disk: JSON, encrypted, then compressed.
pub struct IdentityStore {
    path: PathBuf,
    cipher: Arc<dyn Cipher>,
    compressor: Arc<dyn Compressor>,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<dyn Cipher>, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            path: path.into(),
            cipher,
            compressor,
        }
    }

    pub async fn save(&self, identity: &LoginIdentity) -> LauncherResult<()> {
        let plain = serde_json::to_vec(identity)?;
        let sealed = self.compressor.compress(&self.cipher.encrypt(&plain)?)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&self.path, sealed)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))
    }

    /// Unreadable or foreign files count as "nothing stored".
    pub async fn load(&self) -> Option<LoginIdentity> {
        let raw = tokio::fs::read(&self.path).await.ok()?;
        let opened = self
            .compressor
            .decompress(&raw)
            .and_then(|data| self.cipher.decrypt(&data))
            .and_then(|plain| Ok(serde_json::from_slice::<LoginIdentity>(&plain)?));
        match opened {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!("Ignoring stored identity at {:?}: {e}", self.path);
                None
            }
        }
    }

    pub async fn delete(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not delete {:?}: {e}", self.path);
            }
        }
    }
}
