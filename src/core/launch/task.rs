// ─── Launch Task ───
// Starts the game through the bridge console class, which reads the
// launcher metadata properties and then hands control to the real main class.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, error, info};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaInstallation;
use crate::core::lock::LockFile;
use crate::core::paths::{path_str, quote_if_spaced, GamePaths, BRIDGE_PROPERTY_PREFIX};
use crate::core::process::{split_command_line, ToolCommand, ToolRunner};

const CONSOLE_CLASS: &str = "ironlaunch.bridge.Console";

/// Fully expanded pieces of the final command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedLaunch {
    pub jvm: String,
    pub main_class: String,
    pub game: String,
}

pub struct GameProcess<'a> {
    pub paths: &'a GamePaths,
    pub java: &'a JavaInstallation,
    /// Window title shown by the bridge console.
    pub name: &'a str,
    pub lock: Option<&'a LockFile>,
    pub close_on_exit: bool,
}

impl GameProcess<'_> {
    /// Everything after the Java binary, as one line.
    pub fn command_line(&self, expanded: &ExpandedLaunch) -> String {
        let lock = self
            .lock
            .map(|lock| path_str(lock.path()))
            .unwrap_or_default();

        format!(
            "-cp {bridge} {props} {console} {jvm} {main} {game}",
            bridge = quote_if_spaced(&path_str(&self.paths.bridge_jar)),
            props = [
                ("name", encode(self.name)),
                ("java", encode(&path_str(&self.java.path))),
                ("lock", encode(&lock)),
                ("closeOnExit", self.close_on_exit.to_string()),
            ]
            .iter()
            .map(|(key, value)| format!("-D{BRIDGE_PROPERTY_PREFIX}.{key}={value}"))
            .collect::<Vec<_>>()
            .join(" "),
            console = CONSOLE_CLASS,
            jvm = expanded.jvm,
            main = expanded.main_class,
            game = expanded.game,
        )
    }

    /// Spawn the game and return its pid. The lock is released first so
    /// the bridge can take it over.
    pub async fn spawn(
        &self,
        tools: &dyn ToolRunner,
        expanded: &ExpandedLaunch,
    ) -> LauncherResult<u32> {
        ensure_dir(&self.paths.game_dir).await?;

        let line = self.command_line(expanded);
        let command = ToolCommand::new(&self.java.path)
            .args(split_command_line(&line))
            .current_dir(&self.paths.game_dir);

        info!("Launching {} with Java {:?}", self.name, self.java.path);
        debug!("Command: {} {}", command.display_name(), line);

        if let Some(lock) = self.lock {
            lock.unlock();
        }

        let pid = tools.spawn_detached(&command).await.map_err(|e| {
            error!("Game spawn failed: {e}");
            LauncherError::Launch("Could not run the game.".into())
        })?;
        info!("Game started (pid {pid})");
        Ok(pid)
    }
}

fn encode(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

async fn ensure_dir(dir: &Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))
}
