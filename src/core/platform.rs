// ─── Platform ───
// Host capabilities consulted by rule evaluation, native classifiers,
// legacy JVM flags and machine-key derivation.

use std::fmt;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    Linux,
    Osx,
}

impl OsKind {
    /// Name used by version metadata rules and `natives` maps.
    pub fn rule_name(self) -> &'static str {
        match self {
            OsKind::Windows => "windows",
            OsKind::Linux => "linux",
            OsKind::Osx => "osx",
        }
    }

    /// Separator between classpath entries.
    pub fn path_separator(self) -> char {
        match self {
            OsKind::Windows => ';',
            _ => ':',
        }
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    X86,
    X64,
    Arm,
    Arm64,
}

impl ArchKind {
    pub fn is_64bit(self) -> bool {
        matches!(self, ArchKind::X64 | ArchKind::Arm64)
    }

    /// Parse a JVM `os.arch` property (`amd64`, `x86_64`, `aarch64`, `i386`...).
    pub fn from_java_arch(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        let is_arm = raw.starts_with("arm") || raw.starts_with("aarch");
        match (is_arm, raw.contains("64")) {
            (true, true) => ArchKind::Arm64,
            (true, false) => ArchKind::Arm,
            (false, true) => ArchKind::X64,
            (false, false) => ArchKind::X86,
        }
    }

    /// Short name substituted for `${arch}` in Java binary templates.
    pub fn short_name(self) -> &'static str {
        match self {
            ArchKind::X86 => "x86",
            ArchKind::X64 => "x64",
            ArchKind::Arm => "arm",
            ArchKind::Arm64 => "arm64",
        }
    }
}

/// The single capability object describing the host.
///
/// Built once by [`Platform::detect`] and refined with the properties
/// reported by the Java runtime that will actually run the game, since a
/// 32-bit JVM on a 64-bit host must be treated as 32-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsKind,
    pub arch: ArchKind,
    pub os_version: String,
}

impl Platform {
    pub fn new(os: OsKind, arch: ArchKind, os_version: impl Into<String>) -> Self {
        Self {
            os,
            arch,
            os_version: os_version.into(),
        }
    }

    pub fn detect() -> LauncherResult<Self> {
        let os = if cfg!(target_os = "windows") {
            OsKind::Windows
        } else if cfg!(target_os = "macos") {
            OsKind::Osx
        } else if cfg!(target_os = "linux") {
            OsKind::Linux
        } else {
            return Err(LauncherError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ));
        };

        let arch = match std::env::consts::ARCH {
            "x86" => ArchKind::X86,
            "x86_64" => ArchKind::X64,
            "arm" => ArchKind::Arm,
            "aarch64" => ArchKind::Arm64,
            other => return Err(LauncherError::UnsupportedPlatform(other.to_string())),
        };

        // Rules match against what the JVM reports as `os.version`: the
        // kernel release on Linux, the product version elsewhere.
        let os_version = match os {
            OsKind::Linux => sysinfo::System::kernel_version(),
            _ => sysinfo::System::os_version(),
        }
        .unwrap_or_default();

        Ok(Self::new(os, arch, os_version))
    }

    /// Replace arch and OS version with the values the game's JVM reports.
    pub fn with_java_properties(mut self, os_version: &str, os_arch: &str) -> Self {
        if !os_version.trim().is_empty() {
            self.os_version = os_version.trim().to_string();
        }
        if !os_arch.trim().is_empty() {
            self.arch = ArchKind::from_java_arch(os_arch);
        }
        self
    }

    pub fn is_64bit(&self) -> bool {
        self.arch.is_64bit()
    }

    pub fn path_separator(&self) -> char {
        self.os.path_separator()
    }
}
