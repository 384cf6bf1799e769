// ─── Auth Session ───
// Account sign-in, the Xbox/Minecraft token exchange and the offline
// fallback. Every entry point ends on a page: logged in (online or
// offline) or the login page.

pub mod msa;
pub mod provider;
pub mod store;
pub mod xbox;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::LauncherResult;
use crate::core::http::Http;
use crate::core::pages::PageControl;

pub use msa::{DeviceCodeProvider, TokenCache};
pub use provider::{IdentityProvider, ProviderError};
pub use store::IdentityStore;

const CONNECTION_ERROR_TITLE: &str = "Connection error";
const CONNECTION_ERROR_MESSAGE: &str = "An error occured while connecting to the login servers.";

/// Who the game is launched as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginIdentity {
    #[serde(rename = "playername")]
    pub player_name: String,
    pub uuid: String,
    pub access_token: String,
    /// Always `msa` for accounts signed in here.
    pub user_type: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    pub xuid: String,
    #[serde(rename = "gamerTag")]
    pub gamer_tag: String,
}

/// Where a session call left the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(LoginIdentity),
    /// Stored identity reused because the login servers were unreachable.
    Offline(LoginIdentity),
    SignedOut,
}

impl AuthOutcome {
    pub fn identity(&self) -> Option<&LoginIdentity> {
        match self {
            AuthOutcome::SignedIn(identity) | AuthOutcome::Offline(identity) => Some(identity),
            AuthOutcome::SignedOut => None,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, AuthOutcome::Offline(_))
    }
}

pub struct AuthSession {
    http: Http,
    provider: Arc<dyn IdentityProvider>,
    store: IdentityStore,
}

impl AuthSession {
    pub fn new(http: Http, provider: Arc<dyn IdentityProvider>, store: IdentityStore) -> Self {
        Self {
            http,
            provider,
            store,
        }
    }

    /// Startup sign-in without user interaction.
    pub async fn auto_login(&self, pages: &dyn PageControl) -> AuthOutcome {
        let token = match self.provider.acquire_silent().await {
            Ok(token) => token,
            Err(ProviderError::UiRequired) | Err(ProviderError::Cancelled) => {
                self.store.delete().await;
                pages.show_login();
                return AuthOutcome::SignedOut;
            }
            Err(ProviderError::Network(e)) => {
                warn!("Login servers unreachable: {e}");
                return self.continue_offline(pages).await;
            }
            Err(ProviderError::Service(message)) => return self.fail(pages, &message).await,
        };

        match self.exchange(pages, &token).await {
            Ok(identity) => AuthOutcome::SignedIn(identity),
            Err(e) if e.is_network() => {
                warn!("Login servers unreachable: {e}");
                self.continue_offline(pages).await
            }
            Err(e) => self.fail(pages, &e.to_string()).await,
        }
    }

    /// Interactive sign-in started from the login page.
    pub async fn login(&self, pages: &dyn PageControl) -> AuthOutcome {
        let token = match self.provider.acquire_interactive(pages).await {
            Ok(token) => token,
            Err(ProviderError::Network(e)) => {
                warn!("Login servers unreachable: {e}");
                pages.show_error(CONNECTION_ERROR_TITLE, CONNECTION_ERROR_MESSAGE).await;
                pages.show_login();
                return AuthOutcome::SignedOut;
            }
            // Back button, declined or expired code.
            Err(e) => {
                info!("Interactive login ended: {e}");
                pages.show_login();
                return AuthOutcome::SignedOut;
            }
        };

        match self.exchange(pages, &token).await {
            Ok(identity) => AuthOutcome::SignedIn(identity),
            Err(e) if e.is_network() => {
                pages.show_error(CONNECTION_ERROR_TITLE, CONNECTION_ERROR_MESSAGE).await;
                pages.show_login();
                AuthOutcome::SignedOut
            }
            Err(e) => self.fail(pages, &e.to_string()).await,
        }
    }

    pub async fn logout(&self, pages: &dyn PageControl) -> AuthOutcome {
        pages.show_wait("Logging out...");
        self.store.delete().await;
        self.provider.sign_out().await;
        pages.show_login();
        AuthOutcome::SignedOut
    }

    async fn exchange(&self, pages: &dyn PageControl, account_token: &str) -> LauncherResult<LoginIdentity> {
        pages.show_wait("Logging in to Xbox and Mojang...");
        let identity = xbox::sign_in(&self.http, account_token).await?;
        self.store.save(&identity).await?;
        pages.show_logged_in(&identity, false);
        Ok(identity)
    }

    /// No network calls from here on.
    async fn continue_offline(&self, pages: &dyn PageControl) -> AuthOutcome {
        match self.store.load().await {
            Some(identity) => {
                info!("Continuing offline as {}", identity.player_name);
                pages.show_logged_in(&identity, true);
                AuthOutcome::Offline(identity)
            }
            None => {
                pages.show_error(CONNECTION_ERROR_TITLE, CONNECTION_ERROR_MESSAGE).await;
                self.logout(pages).await
            }
        }
    }

    async fn fail(&self, pages: &dyn PageControl, message: &str) -> AuthOutcome {
        pages.show_error("Login failed", message).await;
        self.logout(pages).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::core::crypto::{GzipCompressor, MachineCipher};
    use crate::core::http::Method;
    use crate::core::testing::{temp_dir, MockTransport, RecordingPages};

    /// Provider that answers with a fixed result and counts sign-outs.
    struct FixedProvider {
        silent: fn() -> Result<String, ProviderError>,
        interactive: fn() -> Result<String, ProviderError>,
        sign_outs: Mutex<usize>,
    }

    impl FixedProvider {
        fn new(
            silent: fn() -> Result<String, ProviderError>,
            interactive: fn() -> Result<String, ProviderError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                silent,
                interactive,
                sign_outs: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        async fn acquire_silent(&self) -> Result<String, ProviderError> {
            (self.silent)()
        }

        async fn acquire_interactive(&self, pages: &dyn PageControl) -> Result<String, ProviderError> {
            let cancel = pages.show_wait_cancelable("Waiting for Microsoft login...");
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            (self.interactive)()
        }

        async fn sign_out(&self) {
            *self.sign_outs.lock().unwrap() += 1;
        }
    }

    fn offline() -> Result<String, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }

    fn granted() -> Result<String, ProviderError> {
        Ok("msa-token".into())
    }

    fn identity() -> LoginIdentity {
        LoginIdentity {
            player_name: "Steve".into(),
            uuid: "069a79f444e94726a5befca90e38aaf5".into(),
            access_token: "mc-token".into(),
            user_type: "msa".into(),
            expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            xuid: "2535".into(),
            gamer_tag: "Steve".into(),
        }
    }

    fn store(dir: &std::path::Path) -> IdentityStore {
        IdentityStore::new(
            dir.join("login.dat"),
            Arc::new(MachineCipher::from_key([5; 16])),
            Arc::new(GzipCompressor),
        )
    }

    fn session(
        transport: Arc<MockTransport>,
        provider: Arc<FixedProvider>,
        dir: &std::path::Path,
    ) -> AuthSession {
        AuthSession::new(Http::new(transport), provider, store(dir))
    }

    #[tokio::test]
    async fn network_failure_with_stored_identity_goes_offline() {
        let dir = temp_dir("auth-offline");
        store(&dir).save(&identity()).await.unwrap();
        let transport = Arc::new(MockTransport::new());
        let pages = RecordingPages::new();

        let outcome = session(transport.clone(), FixedProvider::new(offline, granted), &dir)
            .auto_login(&pages)
            .await;

        assert_eq!(outcome, AuthOutcome::Offline(identity()));
        assert_eq!(pages.events(), vec!["logged-in:Steve:offline"]);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn network_failure_without_identity_errors_then_logs_out() {
        let dir = temp_dir("auth-offline-empty");
        let provider = FixedProvider::new(offline, granted);
        let transport = Arc::new(MockTransport::new());
        let pages = RecordingPages::new();

        let outcome = session(transport.clone(), provider.clone(), &dir)
            .auto_login(&pages)
            .await;

        assert_eq!(outcome, AuthOutcome::SignedOut);
        assert_eq!(
            pages.events(),
            vec![
                format!("error:{CONNECTION_ERROR_TITLE}:{CONNECTION_ERROR_MESSAGE}"),
                "wait:Logging out...".to_string(),
                "login".to_string(),
            ]
        );
        assert_eq!(*provider.sign_outs.lock().unwrap(), 1);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn ui_required_drops_the_stored_identity() {
        let dir = temp_dir("auth-ui");
        store(&dir).save(&identity()).await.unwrap();
        let provider = FixedProvider::new(|| Err(ProviderError::UiRequired), granted);
        let pages = RecordingPages::new();

        let outcome = session(Arc::new(MockTransport::new()), provider, &dir)
            .auto_login(&pages)
            .await;

        assert_eq!(outcome, AuthOutcome::SignedOut);
        assert_eq!(pages.events(), vec!["login"]);
        assert!(!dir.join("login.dat").exists());
    }

    #[tokio::test]
    async fn cancelled_login_returns_to_the_login_page() {
        let dir = temp_dir("auth-cancel");
        let transport = Arc::new(MockTransport::new());
        let pages = RecordingPages {
            cancel_immediately: true,
            ..RecordingPages::default()
        };

        let outcome = session(transport.clone(), FixedProvider::new(offline, granted), &dir)
            .login(&pages)
            .await;

        assert_eq!(outcome, AuthOutcome::SignedOut);
        assert_eq!(
            pages.events(),
            vec!["wait-cancelable:Waiting for Microsoft login...", "login"]
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn exchange_failure_shows_the_hop_message_and_logs_out() {
        let dir = temp_dir("auth-not-owned");
        let transport = Arc::new(
            MockTransport::new()
                .reply(
                    Method::Post,
                    xbox::XBL_AUTHENTICATE_URL,
                    200,
                    r#"{"Token": "xbl", "DisplayClaims": {"xui": [{"uhs": "h"}]}}"#,
                )
                .reply(
                    Method::Post,
                    xbox::XSTS_AUTHORIZE_URL,
                    200,
                    r#"{"Token": "xsts", "DisplayClaims": {"xui": [{"uhs": "h"}]}}"#,
                )
                .reply(
                    Method::Post,
                    xbox::MINECRAFT_LOGIN_URL,
                    200,
                    r#"{"access_token": "mc", "expires_in": 60}"#,
                )
                .reply(Method::Get, xbox::MINECRAFT_PROFILE_URL, 404, ""),
        );
        let pages = RecordingPages::new();

        let outcome = session(transport, FixedProvider::new(granted, granted), &dir)
            .login(&pages)
            .await;

        assert_eq!(outcome, AuthOutcome::SignedOut);
        let events = pages.events();
        assert!(events.contains(&"wait:Logging in to Xbox and Mojang...".to_string()));
        assert!(events.contains(&"error:Login failed:You don't own the game.".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("login"));
    }

    #[tokio::test]
    async fn successful_exchange_persists_the_identity() {
        let dir = temp_dir("auth-ok");
        let transport = Arc::new(
            MockTransport::new()
                .reply(
                    Method::Post,
                    xbox::XBL_AUTHENTICATE_URL,
                    200,
                    r#"{"Token": "xbl", "DisplayClaims": {"xui": [{"uhs": "h"}]}}"#,
                )
                .reply(
                    Method::Post,
                    xbox::XSTS_AUTHORIZE_URL,
                    200,
                    r#"{"Token": "xsts", "DisplayClaims": {"xui": [{"uhs": "h", "xid": "1", "gtg": "G"}]}}"#,
                )
                .reply(
                    Method::Post,
                    xbox::MINECRAFT_LOGIN_URL,
                    200,
                    r#"{"access_token": "mc", "expires_in": 60}"#,
                )
                .reply(
                    Method::Get,
                    xbox::MINECRAFT_PROFILE_URL,
                    200,
                    r#"{"id": "abc", "name": "Alex"}"#,
                ),
        );
        let pages = RecordingPages::new();

        let outcome = session(transport, FixedProvider::new(granted, granted), &dir)
            .auto_login(&pages)
            .await;

        let identity = outcome.identity().cloned().unwrap();
        assert!(!outcome.is_offline());
        assert_eq!(identity.player_name, "Alex");
        assert_eq!(pages.events().last().map(String::as_str), Some("logged-in:Alex:online"));
        assert_eq!(store(&dir).load().await, Some(identity));
    }

    #[test]
    fn identity_uses_the_persisted_key_names() {
        let json = serde_json::to_value(identity()).unwrap();
        assert_eq!(json["playername"], "Steve");
        assert_eq!(json["gamerTag"], "Steve");
        assert!(json.get("expiresAt").is_some());
    }
}
