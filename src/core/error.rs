use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launch pipeline.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} failed: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Serialization ───────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── External tools ──────────────────────────────────
    #[error("External tool failed: {0}")]
    ToolExecution(String),

    // ── Pipeline stages ─────────────────────────────────
    #[error("{0}")]
    Manifest(String),

    #[error("{0}")]
    VersionFile(String),

    #[error("{0}")]
    Assets(String),

    #[error("{0}")]
    Libraries(String),

    #[error("{0}")]
    Forge(String),

    #[error("{0}")]
    Fabric(String),

    #[error("{0}")]
    Profiles(String),

    #[error("{0}")]
    Login(String),

    #[error("{0}")]
    Launch(String),

    #[error("Unknown placeholder ${{{0}}} in the launch arguments.")]
    UnknownPlaceholder(String),

    #[error("{0}")]
    Config(String),

    // ── Invariants ──────────────────────────────────────
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("{0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl From<reqwest::Error> for LauncherError {
    fn from(error: reqwest::Error) -> Self {
        match error.status() {
            Some(status) => LauncherError::HttpStatus {
                url: error.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => LauncherError::Network(error.to_string()),
        }
    }
}

impl LauncherError {
    /// Attach a path to an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the failure happened below HTTP (connect, DNS, TLS, reset).
    pub fn is_network(&self) -> bool {
        matches!(self, LauncherError::Network(_))
    }

    /// Title of the stage that produced this error, as shown to the user.
    pub fn stage_title(&self) -> &'static str {
        match self {
            LauncherError::Manifest(_) => "Versions manifest error",
            LauncherError::VersionFile(_) => "Version file error",
            LauncherError::Assets(_) => "Assets error",
            LauncherError::Libraries(_) => "Libraries error",
            LauncherError::Forge(_) => "Forge install error",
            LauncherError::Fabric(_) => "Fabric install error",
            LauncherError::Profiles(_) => "Profiles file error",
            LauncherError::Login(_) => "Login error",
            LauncherError::Launch(_) | LauncherError::UnknownPlaceholder(_) => "Launch error",
            LauncherError::Config(_) => "Configuration error",
            LauncherError::UnsupportedPlatform(_) => "Unsupported platform",
            _ => "Internal error",
        }
    }

    /// Rewrap into the single user-facing failure.
    pub fn into_launch_failure(self) -> LaunchFailure {
        LaunchFailure {
            title: self.stage_title().to_string(),
            message: self.to_string(),
        }
    }
}

// ── User-facing failures ────────────────────────────────

/// The only failure shape a front-end ever shows: a short stage title
/// plus the message of the error that stopped the attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LaunchFailure {
    pub title: String,
    pub message: String,
}

impl LaunchFailure {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

impl std::error::Error for LaunchFailure {}

impl From<LauncherError> for LaunchFailure {
    fn from(error: LauncherError) -> Self {
        error.into_launch_failure()
    }
}
