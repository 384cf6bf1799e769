// ─── Page Control ───
// The interface a front-end implements so the pipeline can report
// status. Calls never block the pipeline except `show_error`, which
// resolves once the user acknowledges the message.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::auth::LoginIdentity;

/// Progress of one fetch stage: completed count against a fixed total.
pub trait ProgressSink: Send {
    fn set_current(&mut self, name: &str);
    fn set_completed(&mut self, completed: usize);
    fn completed(&self) -> usize;

    fn advance(&mut self) {
        let next = self.completed() + 1;
        self.set_completed(next);
    }
}

#[async_trait]
pub trait PageControl: Send + Sync {
    fn show_wait(&self, title: &str);

    /// Wait page with a cancel button. The token fires when the user cancels.
    fn show_wait_cancelable(&self, title: &str) -> CancellationToken;

    fn show_login(&self);

    fn show_logged_in(&self, identity: &LoginIdentity, offline: bool);

    /// Show an error and resolve once the user acknowledges it.
    async fn show_error(&self, title: &str, message: &str);

    fn show_download_progress(&self, title: &str, total: usize) -> Box<dyn ProgressSink>;
}

/// Headless page control that reports every transition through `tracing`.
#[derive(Debug, Default, Clone)]
pub struct LogPageControl;

struct LogProgress {
    title: String,
    total: usize,
    completed: usize,
}

impl ProgressSink for LogProgress {
    fn set_current(&mut self, name: &str) {
        info!("[{}] {}/{} {}", self.title, self.completed, self.total, name);
    }

    fn set_completed(&mut self, completed: usize) {
        self.completed = completed;
    }

    fn completed(&self) -> usize {
        self.completed
    }
}

#[async_trait]
impl PageControl for LogPageControl {
    fn show_wait(&self, title: &str) {
        info!("{title}");
    }

    fn show_wait_cancelable(&self, title: &str) -> CancellationToken {
        info!("{title}");
        CancellationToken::new()
    }

    fn show_login(&self) {
        info!("Signed out; login required");
    }

    fn show_logged_in(&self, identity: &LoginIdentity, offline: bool) {
        if offline {
            info!("Signed in as {} (offline)", identity.player_name);
        } else {
            info!("Signed in as {}", identity.player_name);
        }
    }

    async fn show_error(&self, title: &str, message: &str) {
        error!("{title}: {message}");
    }

    fn show_download_progress(&self, title: &str, total: usize) -> Box<dyn ProgressSink> {
        info!("{title} ({total} items)");
        Box::new(LogProgress {
            title: title.to_string(),
            total,
            completed: 0,
        })
    }
}
