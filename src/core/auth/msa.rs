// ─── Microsoft Account ───
// OAuth device-code sign-in against the consumers tenant, with silent
// renewal through a refresh token kept encrypted on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::provider::{IdentityProvider, ProviderError};
use crate::core::crypto::Cipher;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{Http, HttpResponse};
use crate::core::pages::PageControl;

pub const DEVICE_CODE_URL: &str =
    "https://login.microsoftonline.com/consumers/oauth2/v2.0/devicecode";
pub const TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";

const SCOPES: &str = "XboxLive.signin offline_access";
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

// ── Token cache ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CachedAccount {
    refresh_token: String,
}

/// Provider state on disk, encrypted only.
pub struct TokenCache {
    path: PathBuf,
    cipher: Arc<dyn Cipher>,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<dyn Cipher>) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    async fn load(&self) -> Option<CachedAccount> {
        let raw = tokio::fs::read(&self.path).await.ok()?;
        match self
            .cipher
            .decrypt(&raw)
            .and_then(|plain| Ok(serde_json::from_slice(&plain)?))
        {
            Ok(account) => Some(account),
            Err(e) => {
                debug!("Token cache unreadable, starting empty: {e}");
                None
            }
        }
    }

    async fn save(&self, account: &CachedAccount) -> LauncherResult<()> {
        let sealed = self.cipher.encrypt(&serde_json::to_vec(account)?)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&self.path, sealed)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))
    }

    async fn clear(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not delete {:?}: {e}", self.path);
            }
        }
    }
}

// ── Wire types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn default_interval() -> u64 {
    5
}

fn default_expiry() -> u64 {
    900
}

#[derive(Debug, Deserialize)]
struct DeviceCode {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

enum TokenReply {
    Granted(TokenResponse),
    Refused { status: u16, error: OAuthError },
}

fn parse_token_reply(response: HttpResponse) -> Result<TokenReply, ProviderError> {
    let status = response.status;
    if response.is_success() {
        let token = serde_json::from_slice(&response.body).map_err(|e| {
            ProviderError::Service(format!("Unexpected response from Microsoft login: {e}"))
        })?;
        return Ok(TokenReply::Granted(token));
    }
    let error = serde_json::from_slice(&response.body).unwrap_or(OAuthError {
        error: String::new(),
        error_description: None,
    });
    Ok(TokenReply::Refused { status, error })
}

// ── Provider ────────────────────────────────────────────

pub struct DeviceCodeProvider {
    http: Http,
    client_id: String,
    cache: TokenCache,
}

impl DeviceCodeProvider {
    pub fn new(http: Http, client_id: impl Into<String>, cache: TokenCache) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            cache,
        }
    }

    async fn post(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpResponse, ProviderError> {
        self.http.post_form(url, fields).await.map_err(ProviderError::from)
    }

    /// Store a rotated refresh token. Failing to persist is not fatal for
    /// the current sign-in.
    async fn remember(&self, token: &TokenResponse, previous: Option<&CachedAccount>) {
        let Some(refresh_token) = &token.refresh_token else {
            return;
        };
        if previous.is_some_and(|p| &p.refresh_token == refresh_token) {
            return;
        }
        let account = CachedAccount {
            refresh_token: refresh_token.clone(),
        };
        if let Err(e) = self.cache.save(&account).await {
            warn!("Could not save the token cache: {e}");
        }
    }

    async fn begin(&self) -> Result<DeviceCode, ProviderError> {
        let response = self
            .post(
                DEVICE_CODE_URL,
                &[("client_id", self.client_id.as_str()), ("scope", SCOPES)],
            )
            .await?;
        if !response.is_success() {
            return Err(ProviderError::Service(format!(
                "Microsoft login error ({})",
                response.status
            )));
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            ProviderError::Service(format!("Unexpected response from Microsoft login: {e}"))
        })
    }
}

#[async_trait]
impl IdentityProvider for DeviceCodeProvider {
    async fn acquire_silent(&self) -> Result<String, ProviderError> {
        let Some(account) = self.cache.load().await else {
            return Err(ProviderError::UiRequired);
        };

        let response = self
            .post(
                TOKEN_URL,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("grant_type", "refresh_token"),
                    ("refresh_token", account.refresh_token.as_str()),
                    ("scope", SCOPES),
                ],
            )
            .await?;

        match parse_token_reply(response)? {
            TokenReply::Granted(token) => {
                debug!("Microsoft token renewed silently");
                self.remember(&token, Some(&account)).await;
                Ok(token.access_token)
            }
            TokenReply::Refused { error, .. }
                if error.error == "invalid_grant" || error.error == "interaction_required" =>
            {
                self.cache.clear().await;
                Err(ProviderError::UiRequired)
            }
            TokenReply::Refused { status, error } => {
                warn!("Silent renewal refused: {} {:?}", error.error, error.error_description);
                Err(ProviderError::Service(format!("Microsoft login error ({status})")))
            }
        }
    }

    async fn acquire_interactive(&self, pages: &dyn PageControl) -> Result<String, ProviderError> {
        let device = self.begin().await?;
        let cancel = pages.show_wait_cancelable(&format!(
            "Waiting for Microsoft login...\nOpen {} and enter the code {}",
            device.verification_uri, device.user_code
        ));
        info!("Device code issued, waiting for the user");

        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = Duration::from_secs(device.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }
            if Instant::now() > deadline {
                return Err(ProviderError::Service("The sign-in code expired.".into()));
            }

            let response = self
                .post(
                    TOKEN_URL,
                    &[
                        ("grant_type", DEVICE_CODE_GRANT),
                        ("client_id", self.client_id.as_str()),
                        ("device_code", device.device_code.as_str()),
                    ],
                )
                .await?;

            match parse_token_reply(response)? {
                TokenReply::Granted(token) => {
                    self.remember(&token, None).await;
                    return Ok(token.access_token);
                }
                TokenReply::Refused { status, error } => match error.error.as_str() {
                    "authorization_pending" => {}
                    "slow_down" => interval += SLOW_DOWN_STEP,
                    "authorization_declined" => {
                        return Err(ProviderError::Service("The sign-in request was declined.".into()))
                    }
                    "expired_token" => {
                        return Err(ProviderError::Service("The sign-in code expired.".into()))
                    }
                    _ => {
                        return Err(ProviderError::Service(format!(
                            "Microsoft login error ({status})"
                        )))
                    }
                },
            }
        }
    }

    async fn sign_out(&self) {
        self.cache.clear().await;
    }
}
