use crate::core::downloader::Downloader;
use crate::core::java::JavaInstallation;
use crate::core::pages::PageControl;
use crate::core::paths::GamePaths;
use crate::core::platform::Platform;
use crate::core::process::ToolRunner;
use crate::core::version::{VersionManifest, VersionResolver};

/// Everything a loader installer may touch, borrowed from the launch context.
pub struct InstallContext<'a> {
    pub paths: &'a GamePaths,
    pub platform: &'a Platform,
    pub java: &'a JavaInstallation,
    pub manifest: &'a VersionManifest,
    pub downloader: &'a Downloader,
    pub tools: &'a dyn ToolRunner,
    pub pages: &'a dyn PageControl,
}

impl<'a> InstallContext<'a> {
    pub fn resolver(&self) -> VersionResolver<'a> {
        VersionResolver::new(self.paths, self.platform)
    }

    /// Make sure the vanilla version `id` is cached locally.
    pub async fn ensure_vanilla_cached(&self, id: &str) -> crate::core::error::LauncherResult<()> {
        self.resolver()
            .ensure_cached(self.manifest, self.downloader, id)
            .await
    }
}
