// ─── External Tools ───
// The one place that spawns native processes: the Java property probe,
// the Forge/Fabric installers, the bytecode patcher and the game itself.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `key=value` lines from stdout.
    pub fn properties(&self) -> Vec<(String, String)> {
        self.stdout
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run to completion capturing stdout and stderr. A non-zero exit is
    /// not an error here; callers interpret the code.
    async fn run(&self, command: &ToolCommand) -> LauncherResult<ToolOutput>;

    /// Start a process without waiting for it. Returns its pid.
    async fn spawn_detached(&self, command: &ToolCommand) -> LauncherResult<u32> {
        Err(LauncherError::ToolExecution(format!(
            "{} cannot be started detached by this runner",
            command.display_name()
        )))
    }
}

#[derive(Debug, Default, Clone)]
pub struct SystemToolRunner;

impl SystemToolRunner {
    fn build(command: &ToolCommand) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, command: &ToolCommand) -> LauncherResult<ToolOutput> {
        debug!("Running {} {:?}", command.program.display(), command.args);

        let output = Self::build(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                LauncherError::ToolExecution(format!(
                    "failed to start {}: {e}",
                    command.program.display()
                ))
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!("{} exited with {:?}", command.display_name(), result.code);
        Ok(result)
    }

    async fn spawn_detached(&self, command: &ToolCommand) -> LauncherResult<u32> {
        let child = Self::build(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                LauncherError::ToolExecution(format!(
                    "failed to start {}: {e}",
                    command.program.display()
                ))
            })?;
        let pid = child.id().unwrap_or_default();
        info!("Started {} (pid {pid})", command.display_name());
        Ok(pid)
    }
}

/// Split a command line on whitespace, honouring double quotes.
/// Quotes delimit a single argument and are removed.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_quoted_segments_together() {
        let args = split_command_line(r#"-cp "/a b/x.jar":/c.jar  Main --name "" --dir "/g d""#);
        assert_eq!(
            args,
            vec!["-cp", "/a b/x.jar:/c.jar", "Main", "--name", "", "--dir", "/g d"]
        );
    }

    #[test]
    fn properties_are_parsed_from_stdout() {
        let output = ToolOutput {
            code: Some(0),
            stdout: "java.version=17.0.2\nos.arch=amd64\nnoise\n".into(),
            stderr: String::new(),
        };
        assert_eq!(
            output.properties(),
            vec![
                ("java.version".to_string(), "17.0.2".to_string()),
                ("os.arch".to_string(), "amd64".to_string())
            ]
        );
        assert!(output.success());
    }
}
