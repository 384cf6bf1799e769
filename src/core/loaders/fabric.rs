// ─── Fabric ───
// Runs the user-provided Fabric installer jar in client mode against our
// data directory and picks up the profile it registers.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use super::context::InstallContext;
use super::installer::LoaderInstaller;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::path_str;
use crate::core::process::ToolCommand;
use crate::core::profiles::ProfileRegistry;

const INSTALLER_PREFIX: &str = "fabric-installer-";

pub struct FabricInstaller {
    game_version: String,
}

impl FabricInstaller {
    pub fn new(game_version: String) -> Self {
        Self { game_version }
    }

    /// Registry key the Fabric installer uses.
    pub fn profile_key(&self) -> String {
        format!("fabric-loader-{}", self.game_version)
    }

    /// The single `fabric-installer-*.jar` in `fabric/`.
    async fn find_installer(&self, ctx: &InstallContext<'_>) -> LauncherResult<PathBuf> {
        let dir = &ctx.paths.fabric_dir;
        let mut found = Vec::new();
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| LauncherError::io(dir, e))?
            {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with(INSTALLER_PREFIX) && name.ends_with(".jar") {
                    found.push(entry.path());
                }
            }
        }

        match found.len() {
            0 => Err(LauncherError::Fabric(
                "Couldn't find the Fabric installer.".into(),
            )),
            1 => Ok(found.remove(0)),
            _ => Err(LauncherError::Fabric(
                "Too many Fabric installers. Only provide one.".into(),
            )),
        }
    }
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
    async fn installed_version_id(&self, ctx: &InstallContext<'_>) -> LauncherResult<Option<String>> {
        // A corrupt registry just means "not installed" here.
        Ok(
            ProfileRegistry::version_id(&ctx.paths.profiles_file(), &self.profile_key())
                .await
                .unwrap_or(None),
        )
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<String> {
        let installer = self.find_installer(ctx).await?;
        ctx.pages.show_wait("Installing Fabric...");
        info!("Installing Fabric for {}", self.game_version);

        ProfileRegistry::create_if_missing(&ctx.paths.profiles_file()).await?;

        let file_name = installer
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let command = ToolCommand::new(&ctx.java.path)
            .arg("-jar")
            .arg(file_name)
            .arg("client")
            .arg("-dir")
            .arg(path_str(&ctx.paths.data_dir))
            .arg("-mcversion")
            .arg(&self.game_version)
            .current_dir(&ctx.paths.fabric_dir);

        let failed = || LauncherError::Fabric("Installation failed".into());
        let output = ctx.tools.run(&command).await.map_err(|_| failed())?;
        if !output.success() {
            warn!("Fabric installer exited with {:?}: {}", output.code, output.stderr.trim());
            return Err(failed());
        }

        self.installed_version_id(ctx).await?.ok_or_else(failed)
    }
}
