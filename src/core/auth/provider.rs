use async_trait::async_trait;
use thiserror::Error;

use crate::core::error::LauncherError;
use crate::core::pages::PageControl;

/// Failures of the first hop (the account provider), kept apart from
/// `LauncherError` because the session routes on them.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No usable cached account; the user has to sign in.
    #[error("Interactive login is required.")]
    UiRequired,

    /// The user backed out of the interactive login.
    #[error("Login was cancelled.")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Service(String),
}

impl From<ProviderError> for LauncherError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Network(message) => LauncherError::Network(message),
            other => LauncherError::Login(other.to_string()),
        }
    }
}

impl From<LauncherError> for ProviderError {
    fn from(error: LauncherError) -> Self {
        match error {
            LauncherError::Network(message) => ProviderError::Network(message),
            other => ProviderError::Service(other.to_string()),
        }
    }
}

/// Produces the account access token the Xbox exchange starts from.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Renew from the cached account without user interaction.
    async fn acquire_silent(&self) -> Result<String, ProviderError>;

    /// Sign in interactively. Implementations show their own cancelable
    /// wait page.
    async fn acquire_interactive(&self, pages: &dyn PageControl) -> Result<String, ProviderError>;

    /// Forget the cached account.
    async fn sign_out(&self);
}
