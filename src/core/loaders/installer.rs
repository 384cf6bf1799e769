use async_trait::async_trait;

use crate::core::error::LauncherResult;

use super::{context::InstallContext, fabric::FabricInstaller, forge::ForgeInstaller};

/// Mod loader requested by the game configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModLoaderRequest {
    /// `<game>-<major>.<minor>.<patch>[.<build>]`
    Forge(String),
    /// Game version to install the Fabric loader for.
    Fabric(String),
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    /// Version id registered by a previous install, if any.
    async fn installed_version_id(&self, ctx: &InstallContext<'_>) -> LauncherResult<Option<String>>;

    /// Install and return the version id the game must be launched as.
    async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<String>;
}

/// Static dispatch over the supported loaders.
pub enum Installer {
    Forge(ForgeInstaller),
    Fabric(FabricInstaller),
}

impl Installer {
    pub fn new(request: &ModLoaderRequest) -> LauncherResult<Self> {
        Ok(match request {
            ModLoaderRequest::Forge(version) => Self::Forge(ForgeInstaller::new(version)?),
            ModLoaderRequest::Fabric(game_version) => {
                Self::Fabric(FabricInstaller::new(game_version.clone()))
            }
        })
    }

    fn inner(&self) -> &dyn LoaderInstaller {
        match self {
            Installer::Forge(i) => i,
            Installer::Fabric(i) => i,
        }
    }

    /// Version id to launch, installing first when nothing is registered.
    pub async fn ensure_installed(&self, ctx: &InstallContext<'_>) -> LauncherResult<String> {
        let installer = self.inner();
        let id = match installer.installed_version_id(ctx).await? {
            Some(id) => id,
            None => installer.install(ctx).await?,
        };
        if let Installer::Forge(forge) = self {
            forge.copy_fml_libs_if_required(ctx).await?;
        }
        Ok(id)
    }
}
