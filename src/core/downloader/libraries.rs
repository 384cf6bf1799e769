// ─── Artifact Fetcher ───
// Makes every file a `GameSpecification` needs present and verified:
// assets, libraries, the client jar and extracted natives. Downloads run
// one at a time in list order.

use std::path::{Path, PathBuf};

use tracing::info;

use super::Downloader;
use crate::core::assets::{self, AssetLayout, AssetStore};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::natives;
use crate::core::pages::PageControl;
use crate::core::paths::GamePaths;
use crate::core::version::{ArtifactDescriptor, AssetIndexRef, GameSpecification};

pub struct ArtifactFetcher<'a> {
    downloader: &'a Downloader,
    paths: &'a GamePaths,
    pages: &'a dyn PageControl,
}

impl<'a> ArtifactFetcher<'a> {
    pub fn new(downloader: &'a Downloader, paths: &'a GamePaths, pages: &'a dyn PageControl) -> Self {
        Self {
            downloader,
            paths,
            pages,
        }
    }

    pub async fn fetch_assets(
        &self,
        index: &AssetIndexRef,
        store: &AssetStore,
    ) -> LauncherResult<AssetLayout> {
        assets::fetch_assets(self.downloader, self.paths, store, self.pages, index).await
    }

    /// Download every missing library artifact and native archive.
    pub async fn fetch_libraries(&self, spec: &GameSpecification) -> LauncherResult<()> {
        let wanted: Vec<(String, &ArtifactDescriptor)> = spec
            .libraries
            .iter()
            .flat_map(|lib| {
                let name = lib.name();
                lib.primary
                    .iter()
                    .chain(lib.native.iter())
                    .map(move |artifact| (name.clone(), artifact))
            })
            .collect();

        let mut progress = self
            .pages
            .show_download_progress("Checking libraries", wanted.len());
        let mut fetched = 0usize;

        for (name, artifact) in wanted {
            progress.set_current(&name);
            let dest = self.paths.library_path(&artifact.path);

            if !tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                if artifact.url.is_empty() {
                    return Err(LauncherError::Libraries(format!(
                        "Library \"{name}\" is missing and has no download URL."
                    )));
                }
                self.downloader
                    .download_file(&artifact.url, &dest, artifact.sha1.as_deref())
                    .await
                    .map_err(|e| {
                        LauncherError::Libraries(format!(
                            "Failed to download library \"{name}\": {e}"
                        ))
                    })?;
                fetched += 1;
            }

            progress.advance();
        }

        info!("Libraries ready ({} downloaded)", fetched);
        Ok(())
    }

    /// Download the client jar when it is absent or empty. An empty jar is
    /// what the Fabric installer leaves behind.
    pub async fn fetch_client_artifact(&self, spec: &GameSpecification) -> LauncherResult<()> {
        let dest = spec.client_jar(self.paths);
        let file_name = format!("{}.jar", spec.id);

        let mut progress = self.pages.show_download_progress("Checking game", 1);
        progress.set_current(&file_name);

        let present = match tokio::fs::metadata(&dest).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        };
        if !present {
            let download = spec.client_download.as_ref().ok_or_else(|| {
                LauncherError::Libraries(format!("Missing \"{file_name}\"."))
            })?;
            let replace = async {
                if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
                    tokio::fs::remove_file(&dest)
                        .await
                        .map_err(|e| LauncherError::io(&dest, e))?;
                }
                self.downloader
                    .download_file(&download.url, &dest, download.sha1.as_deref())
                    .await
            };
            replace.await.map_err(|e| {
                LauncherError::Libraries(format!("Failed to download \"{file_name}\": {e}"))
            })?;
        }

        progress.advance();
        Ok(())
    }

    /// Unpack every native archive of `spec` into `target_dir`.
    pub async fn extract_natives(
        &self,
        spec: &GameSpecification,
        target_dir: &Path,
    ) -> LauncherResult<()> {
        let jobs: Vec<(String, PathBuf, Vec<String>)> = spec
            .libraries
            .iter()
            .filter_map(|lib| {
                lib.native
                    .as_ref()
                    .map(|n| (lib.name(), self.paths.library_path(&n.path), lib.exclude.clone()))
            })
            .collect();

        let target = target_dir.to_path_buf();
        let written = tokio::task::spawn_blocking(move || -> LauncherResult<usize> {
            std::fs::create_dir_all(&target).map_err(|e| LauncherError::io(&target, e))?;
            let mut total = 0;
            for (name, archive, exclude) in jobs {
                total += natives::extract_archive(&archive, &target, &exclude).map_err(|e| {
                    LauncherError::Libraries(format!(
                        "Failed to extract natives from \"{name}\": {e}"
                    ))
                })?;
            }
            Ok(total)
        })
        .await
        .map_err(|e| LauncherError::Internal(format!("Natives extraction task failed: {e}")))??;

        info!("Natives ready in {:?} ({} files extracted)", target_dir, written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::hash::sha1_hex;
    use crate::core::http::{Http, Method};
    use crate::core::testing::{temp_dir, write_file, write_zip, MockTransport, RecordingPages};
    use crate::core::version::{DownloadInfo, LaunchArguments, LibraryRequirement};

    fn spec_with(libraries: Vec<LibraryRequirement>, client: Option<DownloadInfo>) -> GameSpecification {
        GameSpecification {
            id: "1.20.1".into(),
            game_type: "release".into(),
            main_class: "net.minecraft.client.main.Main".into(),
            java_major: None,
            asset_index: AssetIndexRef {
                id: "5".into(),
                url: String::new(),
                sha1: None,
            },
            libraries,
            client_download: client,
            arguments: LaunchArguments::Legacy {
                minecraft_arguments: String::new(),
            },
            logging: None,
        }
    }

    fn library(artifact: &str, descriptor: ArtifactDescriptor, native: bool) -> LibraryRequirement {
        LibraryRequirement {
            group: "org.example".into(),
            artifact: artifact.into(),
            version: "1.0".into(),
            primary: (!native).then(|| descriptor.clone()),
            native: native.then_some(descriptor),
            exclude: Vec::new(),
        }
    }

    #[tokio::test]
    async fn tampered_library_is_rejected_and_not_placed() {
        let paths = GamePaths::new(temp_dir("libs-tampered"));
        let url = "https://libraries.minecraft.net/org/example/a/1.0/a-1.0.jar";
        let transport = Arc::new(MockTransport::new().reply(Method::Get, url, 200, b"evil"));
        let downloader = Downloader::new(Http::new(transport));
        let pages = RecordingPages::new();
        let spec = spec_with(
            vec![library(
                "a",
                ArtifactDescriptor {
                    path: "org/example/a/1.0/a-1.0.jar".into(),
                    sha1: Some(sha1_hex(b"genuine")),
                    url: url.into(),
                },
                false,
            )],
            None,
        );

        let err = ArtifactFetcher::new(&downloader, &paths, &pages)
            .fetch_libraries(&spec)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Libraries(_)));
        assert!(err.to_string().contains("org.example:a:1.0"));
        assert!(!paths.library_path("org/example/a/1.0/a-1.0.jar").exists());
    }

    #[tokio::test]
    async fn empty_client_jar_is_replaced() {
        let paths = GamePaths::new(temp_dir("libs-client"));
        write_file(&paths.client_jar("1.20.1"), b"");
        let url = "https://piston-data.mojang.com/client.jar";
        let transport = Arc::new(MockTransport::new().reply(Method::Get, url, 200, b"client"));
        let downloader = Downloader::new(Http::new(transport.clone()));
        let pages = RecordingPages::new();
        let spec = spec_with(
            Vec::new(),
            Some(DownloadInfo {
                url: url.into(),
                sha1: Some(sha1_hex(b"client")),
            }),
        );
        let fetcher = ArtifactFetcher::new(&downloader, &paths, &pages);

        fetcher.fetch_client_artifact(&spec).await.unwrap();
        fetcher.fetch_client_artifact(&spec).await.unwrap();

        assert_eq!(std::fs::read(paths.client_jar("1.20.1")).unwrap(), b"client");
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn failed_client_replacement_is_a_libraries_error() {
        let paths = GamePaths::new(temp_dir("libs-client-fail"));
        write_file(&paths.client_jar("1.20.1"), b"");
        let url = "https://piston-data.mojang.com/client.jar";
        let transport = Arc::new(MockTransport::new().reply(Method::Get, url, 404, b""));
        let downloader = Downloader::new(Http::new(transport));
        let pages = RecordingPages::new();
        let spec = spec_with(
            Vec::new(),
            Some(DownloadInfo {
                url: url.into(),
                sha1: None,
            }),
        );

        let err = ArtifactFetcher::new(&downloader, &paths, &pages)
            .fetch_client_artifact(&spec)
            .await
            .unwrap_err();

        assert_eq!(err.stage_title(), "Libraries error");
        assert!(err.to_string().starts_with("Failed to download \"1.20.1.jar\""));
    }

    #[tokio::test]
    async fn missing_client_without_download_info_fails() {
        let paths = GamePaths::new(temp_dir("libs-noclient"));
        let downloader = Downloader::new(Http::new(Arc::new(MockTransport::new())));
        let pages = RecordingPages::new();
        let err = ArtifactFetcher::new(&downloader, &paths, &pages)
            .fetch_client_artifact(&spec_with(Vec::new(), None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing \"1.20.1.jar\".");
    }

    #[tokio::test]
    async fn natives_are_extracted_per_version() {
        let paths = GamePaths::new(temp_dir("libs-natives"));
        write_zip(
            &paths.library_path("n/natives-linux.jar"),
            &[("liblwjgl.so", b"so"), ("META-INF/MANIFEST.MF", b"m")],
        );
        let downloader = Downloader::new(Http::new(Arc::new(MockTransport::new())));
        let pages = RecordingPages::new();
        let spec = spec_with(
            vec![library(
                "lwjgl-platform",
                ArtifactDescriptor {
                    path: "n/natives-linux.jar".into(),
                    sha1: None,
                    url: "https://x/n.jar".into(),
                },
                true,
            )],
            None,
        );
        let target = paths.natives_dir("1.20.1");
        ArtifactFetcher::new(&downloader, &paths, &pages)
            .extract_natives(&spec, &target)
            .await
            .unwrap();
        assert!(target.join("liblwjgl.so").exists());
        assert!(!target.join("META-INF").exists());
    }
}
