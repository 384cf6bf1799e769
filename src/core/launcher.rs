// ─── Launcher ───
// Process-wide state, built once at startup: paths, game config, user
// settings, the lock file, the client id and the auth session.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::core::auth::{AuthOutcome, AuthSession, DeviceCodeProvider, IdentityStore, TokenCache};
use crate::core::config::{resolve_client_id, GameConfig, Settings, DEFAULT_TITLE};
use crate::core::crypto::{Cipher, GzipCompressor, MachineCipher};
use crate::core::downloader::Downloader;
use crate::core::error::{LaunchFailure, LauncherResult};
use crate::core::http::Http;
use crate::core::launch::{launch, LaunchContext};
use crate::core::lock::LockFile;
use crate::core::pages::PageControl;
use crate::core::paths::GamePaths;
use crate::core::platform::Platform;
use crate::core::process::{SystemToolRunner, ToolRunner};

/// Azure application id baked in at build time.
const BUILT_IN_CLIENT_ID: Option<&str> = option_env!("IRONLAUNCH_AZURE_CLIENT_ID");

/// Startup refused before any page is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFailure {
    pub title: String,
    pub message: String,
}

impl StartupFailure {
    fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for StartupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl std::error::Error for StartupFailure {}

/// Host-facing services, swapped out in tests.
pub struct Services {
    pub http: Http,
    pub tools: Arc<dyn ToolRunner>,
    pub host: Platform,
    pub cipher: Arc<dyn Cipher>,
}

impl Services {
    pub async fn system() -> LauncherResult<Self> {
        let host = Platform::detect()?;
        let tools: Arc<dyn ToolRunner> = Arc::new(SystemToolRunner);
        let cipher = MachineCipher::for_host(&host, tools.as_ref()).await?;
        Ok(Self {
            http: Http::reqwest()?,
            tools,
            host,
            cipher: Arc::new(cipher),
        })
    }
}

pub struct Launcher {
    paths: GamePaths,
    config: GameConfig,
    settings: Settings,
    host: Platform,
    client_id: String,
    lock: Option<LockFile>,
    downloader: Downloader,
    tools: Arc<dyn ToolRunner>,
    auth: AuthSession,
}

impl Launcher {
    /// Start against `base_dir` with the real host services.
    pub async fn init(base_dir: impl Into<PathBuf>) -> Result<Self, StartupFailure> {
        let services = Services::system()
            .await
            .map_err(|e| StartupFailure::new(DEFAULT_TITLE, e.to_string()))?;
        Self::with_services(base_dir, services).await
    }

    pub async fn with_services(
        base_dir: impl Into<PathBuf>,
        services: Services,
    ) -> Result<Self, StartupFailure> {
        let base_dir = absolute(base_dir.into());
        let paths = GamePaths::new(&base_dir);

        let config = GameConfig::load(&paths.config_file())
            .await
            .map_err(|e| StartupFailure::new(DEFAULT_TITLE, e.to_string()))?;
        let fail = |message: String| StartupFailure::new(config.name.clone(), message);

        let azure_client_id = config
            .azure_client_id
            .clone()
            .or_else(|| BUILT_IN_CLIENT_ID.map(str::to_string))
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                StartupFailure::new(
                    DEFAULT_TITLE,
                    "This launcher was compiled without an Azure Application key and can not run.",
                )
            })?;

        let lock = match config.lock_path(&base_dir).map_err(|e| fail(e.to_string()))? {
            Some(path) => Some(
                LockFile::acquire(&path)
                    .map_err(|e| fail(e.to_string()))?
                    .ok_or_else(|| {
                        fail("The files used by this launcher are currently in use.".into())
                    })?,
            ),
            None => None,
        };

        let settings = Settings::load(&paths.settings_file()).await;
        let client_id = resolve_client_id(&paths, services.host.os)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let provider = DeviceCodeProvider::new(
            services.http.clone(),
            azure_client_id,
            TokenCache::new(paths.token_cache_file(), services.cipher.clone()),
        );
        let store = IdentityStore::new(
            paths.identity_file(),
            services.cipher.clone(),
            Arc::new(GzipCompressor),
        );
        let auth = AuthSession::new(services.http.clone(), Arc::new(provider), store);

        info!("Launcher ready for \"{}\" in {:?}", config.name, base_dir);
        Ok(Self {
            paths,
            config,
            settings,
            host: services.host,
            client_id,
            lock,
            downloader: Downloader::new(services.http),
            tools: services.tools,
            auth,
        })
    }

    pub fn paths(&self) -> &GamePaths {
        &self.paths
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub async fn save_settings(&mut self, settings: Settings) -> LauncherResult<()> {
        settings.save(&self.paths.settings_file()).await?;
        self.settings = settings;
        Ok(())
    }

    /// Launch with the identity from `outcome`. Failures are shown on
    /// `pages` before being returned.
    pub async fn launch(
        &self,
        pages: &dyn PageControl,
        outcome: &AuthOutcome,
    ) -> Result<u32, LaunchFailure> {
        let Some(identity) = outcome.identity() else {
            let failure = LaunchFailure::new("Login error", "Not logged in.");
            pages.show_error(&failure.title, &failure.message).await;
            return Err(failure);
        };

        let ctx = LaunchContext {
            paths: &self.paths,
            config: &self.config,
            settings: &self.settings,
            host: &self.host,
            client_id: &self.client_id,
            identity,
            offline: outcome.is_offline(),
            downloader: &self.downloader,
            tools: self.tools.as_ref(),
            pages,
            lock: self.lock.as_ref(),
        };

        let result = launch(&ctx).await;
        if let Err(failure) = &result {
            pages.show_error(&failure.title, &failure.message).await;
        }
        result
    }

    /// Release the lock file on normal shutdown.
    pub fn exit(&self) {
        if let Some(lock) = &self.lock {
            lock.unlock();
        }
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
