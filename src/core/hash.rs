// ─── Hashing ───
// SHA-1 is the only trust mechanism for downloaded artifacts.

use std::path::Path;

use sha1::{Digest, Sha1};

use crate::core::error::{LauncherError, LauncherResult};

/// Lowercase hex SHA-1 of a byte slice.
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(sha1_hex(&bytes))
}

/// Case-insensitive comparison of hex digests.
pub fn digest_matches(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

/// Check `bytes` against `expected`, reporting `path` on mismatch.
pub fn verify_sha1(bytes: &[u8], expected: &str, path: &Path) -> LauncherResult<()> {
    let actual = sha1_hex(bytes);
    if digest_matches(&actual, expected) {
        Ok(())
    } else {
        Err(LauncherError::Sha1Mismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}
