// ─── Launch Pipeline ───
// One launch attempt, start to finish: Java probe, version resolution,
// mod loader install, artifact fetch, argument expansion, game spawn.
// Runs strictly in sequence; every stage error surfaces as one LaunchFailure.

use std::path::PathBuf;

use tracing::{error, info};

use crate::core::assets::{AssetLayout, AssetStore};
use crate::core::auth::LoginIdentity;
use crate::core::config::{GameConfig, LaunchTarget, Settings};
use crate::core::downloader::{ArtifactFetcher, Downloader};
use crate::core::error::{LaunchFailure, LauncherError, LauncherResult};
use crate::core::java::{expand_java_template, probe_java, JavaInstallation};
use crate::core::loaders::{InstallContext, Installer};
use crate::core::lock::LockFile;
use crate::core::pages::PageControl;
use crate::core::paths::GamePaths;
use crate::core::platform::Platform;
use crate::core::process::ToolRunner;
use crate::core::version::{
    AssetIndexRef, GameSpecification, LaunchTemplates, VersionManifest, VersionResolver,
};

use super::args::{
    clean_user_args, clean_user_vm_args, natives_dir_if_any, ArgumentContext,
    LaunchArgumentBuilder,
};
use super::task::{ExpandedLaunch, GameProcess};

const DEFAULT_JAVA: &str = "java";

/// Everything one launch attempt borrows from the launcher.
pub struct LaunchContext<'a> {
    pub paths: &'a GamePaths,
    pub config: &'a GameConfig,
    pub settings: &'a Settings,
    pub host: &'a Platform,
    pub client_id: &'a str,
    pub identity: &'a LoginIdentity,
    /// Skip every download that isn't already cached.
    pub offline: bool,
    pub downloader: &'a Downloader,
    pub tools: &'a dyn ToolRunner,
    pub pages: &'a dyn PageControl,
    pub lock: Option<&'a LockFile>,
}

/// Run one launch attempt and return the game's pid.
pub async fn launch(ctx: &LaunchContext<'_>) -> Result<u32, LaunchFailure> {
    prepare_then_launch(ctx).await.map_err(|e| {
        error!("Launch failed: {e}");
        e.into_launch_failure()
    })
}

async fn prepare_then_launch(ctx: &LaunchContext<'_>) -> LauncherResult<u32> {
    let java = find_java(ctx).await?;
    let platform = java.platform(ctx.host.clone());
    let target = ctx.config.target()?;

    let spec = match &target {
        LaunchTarget::Args(_) => None,
        LaunchTarget::Version(id) => Some(resolve_version(ctx, &platform, id, None).await?),
        LaunchTarget::Loader(request) => {
            let manifest = VersionManifest::load(ctx.downloader.http(), ctx.paths, ctx.offline).await?;
            let installer = Installer::new(request)?;
            let id = installer
                .ensure_installed(&InstallContext {
                    paths: ctx.paths,
                    platform: &platform,
                    java: &java,
                    manifest: &manifest,
                    downloader: ctx.downloader,
                    tools: ctx.tools,
                    pages: ctx.pages,
                })
                .await?;
            Some(resolve_version(ctx, &platform, &id, Some(&manifest)).await?)
        }
    };

    if let Some(required) = spec.as_ref().and_then(|s| s.java_major) {
        java.require(required)?;
    }

    let fetcher = ArtifactFetcher::new(ctx.downloader, ctx.paths, ctx.pages);
    let assets = fetch_assets(ctx, &fetcher, spec.as_ref()).await?;

    let natives_dir = match &spec {
        Some(spec) => {
            fetcher.fetch_libraries(spec).await?;
            fetcher.fetch_client_artifact(spec).await?;
            let natives = natives_dir_if_any(spec, ctx.paths);
            if let Some(dir) = &natives {
                fetcher.extract_natives(spec, dir).await?;
            }
            natives
        }
        None => None,
    };

    let templates = match (&target, &spec) {
        (LaunchTarget::Args(args), _) => LaunchTemplates {
            jvm: clean_user_vm_args(&args.vm_args, &platform),
            main_class: args.main_class.trim().to_string(),
            game: clean_user_args(&args.game_args),
        },
        (_, Some(spec)) => spec.launch_templates(ctx.paths, &platform)?,
        (_, None) => {
            return Err(LauncherError::Internal(
                "No version was resolved for the launch target.".into(),
            ))
        }
    };

    ctx.pages.show_wait("Running the game...");
    let builder = LaunchArgumentBuilder::new(ArgumentContext {
        paths: ctx.paths,
        platform: &platform,
        identity: ctx.identity,
        client_id: ctx.client_id,
        spec: spec.as_ref(),
        assets: assets.as_ref(),
        natives_dir: natives_dir.as_deref(),
    });

    let mut jvm = builder.expand(&templates.jvm)?;
    if !ctx.settings.jre_args.is_empty() {
        jvm.push(' ');
        jvm.push_str(&ctx.settings.jre_args);
    }
    let expanded = ExpandedLaunch {
        jvm,
        main_class: templates.main_class,
        game: builder.expand(&templates.game)?,
    };

    GameProcess {
        paths: ctx.paths,
        java: &java,
        name: &ctx.config.name,
        lock: ctx.lock,
        close_on_exit: ctx.settings.close_on_exit,
    }
    .spawn(ctx.tools, &expanded)
    .await
}

async fn find_java(ctx: &LaunchContext<'_>) -> LauncherResult<JavaInstallation> {
    let binary = ctx
        .settings
        .java_binary(ctx.config)
        .map(|template| expand_java_template(&template, ctx.host))
        .unwrap_or_else(|| DEFAULT_JAVA.to_string());

    probe_java(ctx.tools, ctx.paths, &PathBuf::from(&binary))
        .await
        .map_err(|e| {
            error!("Java probe failed: {e}");
            LauncherError::Launch("Can't find a valid Java JRE.".into())
        })
}

/// Cache (downloading when needed) and resolve `id`. A manifest already
/// loaded by the loader step is reused.
async fn resolve_version(
    ctx: &LaunchContext<'_>,
    platform: &Platform,
    id: &str,
    manifest: Option<&VersionManifest>,
) -> LauncherResult<GameSpecification> {
    ctx.pages.show_wait("Verifying game version data...");
    let loaded;
    let manifest = match manifest {
        Some(manifest) => manifest,
        None => {
            loaded = VersionManifest::load(ctx.downloader.http(), ctx.paths, ctx.offline).await?;
            &loaded
        }
    };

    let resolver = VersionResolver::new(ctx.paths, platform);
    resolver.ensure_cached(manifest, ctx.downloader, id).await?;
    let spec = resolver.resolve(id).await?;
    info!(
        "Resolved {} ({} libraries, Java {:?})",
        spec.id,
        spec.libraries.len(),
        spec.java_major
    );
    Ok(spec)
}

/// The version's asset index wins over the configured one.
async fn fetch_assets(
    ctx: &LaunchContext<'_>,
    fetcher: &ArtifactFetcher<'_>,
    spec: Option<&GameSpecification>,
) -> LauncherResult<Option<AssetLayout>> {
    let index = match (spec, &ctx.config.assets) {
        (Some(spec), _) => spec.asset_index.clone(),
        (None, Some(configured)) => AssetIndexRef {
            id: configured.id.clone(),
            url: configured.url.clone(),
            sha1: None,
        },
        (None, None) => return Ok(None),
    };

    let store = if ctx.config.share_assets {
        AssetStore::shared(ctx.host.os)?
    } else {
        AssetStore::local(ctx.paths)
    };
    fetcher.fetch_assets(&index, &store).await.map(Some)
}
