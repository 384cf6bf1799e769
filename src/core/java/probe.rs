// ─── Java Probe ───
// Asks the game's JVM for its own properties through the launcher bridge,
// so version checks and platform rules see what the game will see.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::GamePaths;
use crate::core::platform::Platform;
use crate::core::process::{ToolCommand, ToolRunner};

const PROPERTIES_CLASS: &str = "ironlaunch.bridge.GetProperties";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    /// Descriptive major version: `1.8.0_392` is 8, `17.0.2` is 17.
    pub major: u32,
    pub is_64bit: bool,
    pub os_version: String,
    pub os_arch: String,
}

impl JavaInstallation {
    /// Fail unless this runtime is at least `required`.
    pub fn require(&self, required: u32) -> LauncherResult<()> {
        if self.major < required {
            return Err(LauncherError::Launch(format!(
                "The game requires Java {required} but found Java {}.",
                self.major
            )));
        }
        Ok(())
    }

    /// Host platform refined with what this JVM reports.
    pub fn platform(&self, host: Platform) -> Platform {
        host.with_java_properties(&self.os_version, &self.os_arch)
    }
}

fn parse_major_version(version: &str) -> u32 {
    let leading = |part: &str| -> u32 {
        part.chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse()
            .unwrap_or(0)
    };
    let mut parts = version.split('.');
    let first = parts.next().map(leading).unwrap_or(0);
    if first == 1 {
        parts.next().map(leading).unwrap_or(first)
    } else {
        first
    }
}

/// Substitute `${os}` and `${arch}` in a configured Java binary path.
pub fn expand_java_template(template: &str, platform: &Platform) -> String {
    template
        .replace("${os}", platform.os.rule_name())
        .replace("${arch}", platform.arch.short_name())
}

/// Run the bridge property dump with `java` and parse the result.
pub async fn probe_java(
    runner: &dyn ToolRunner,
    paths: &GamePaths,
    java: &Path,
) -> LauncherResult<JavaInstallation> {
    let command = ToolCommand::new(java)
        .arg("-cp")
        .arg(paths.bridge_jar.to_string_lossy())
        .arg(PROPERTIES_CLASS)
        .args(["java.version", "os.version", "os.arch"]);

    let output = runner.run(&command).await.map_err(|e| {
        LauncherError::Launch(format!("Cannot run Java at {}: {e}", java.display()))
    })?;
    if !output.success() {
        return Err(LauncherError::Launch(format!(
            "Java at {} failed to report its version (exit code {:?}).",
            java.display(),
            output.code
        )));
    }

    let mut version = None;
    let mut os_version = String::new();
    let mut os_arch = String::new();
    for (key, value) in output.properties() {
        match key.as_str() {
            "java.version" => version = Some(value),
            "os.version" => os_version = value,
            "os.arch" => os_arch = value,
            _ => {}
        }
    }
    let version = version.ok_or_else(|| {
        LauncherError::Launch(format!("Java at {} didn't report its version.", java.display()))
    })?;

    let installation = JavaInstallation {
        path: java.to_path_buf(),
        major: parse_major_version(&version),
        is_64bit: os_arch.contains("64"),
        version,
        os_version,
        os_arch,
    };
    info!(
        "Using Java {} ({}-bit) at {:?}",
        installation.version,
        if installation.is_64bit { 64 } else { 32 },
        installation.path
    );
    Ok(installation)
}
