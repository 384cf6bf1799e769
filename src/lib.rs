pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::auth::{AuthOutcome, AuthSession, LoginIdentity};
pub use crate::core::config::{GameConfig, Settings};
pub use crate::core::error::{LaunchFailure, LauncherError, LauncherResult};
pub use crate::core::launcher::{Launcher, Services, StartupFailure};
pub use crate::core::pages::{LogPageControl, PageControl, ProgressSink};

/// Structured logging for a front-end binary. `RUST_LOG` overrides the
/// default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ironlaunch_lib=debug")),
        )
        .try_init();
}
