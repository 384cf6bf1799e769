// ─── Encryption at Rest ───
// Identity and token caches are sealed with a key derived from the
// machine id, so a copied file is useless on another computer.

use std::io::{Read, Write};
use std::sync::LazyLock;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::{OsKind, Platform};
use crate::core::process::{ToolCommand, ToolRunner};

const NONCE_LEN: usize = 12;

static MAC_UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""IOPlatformUUID"\s*=\s*"([A-Fa-f0-9-]{36})""#).expect("Invalid regex")
});
static WINDOWS_GUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"MachineGuid\s+REG_SZ\s+([A-Fa-f0-9-]{36})").expect("Invalid regex")
});

pub trait Cipher: Send + Sync {
    fn encrypt(&self, plain: &[u8]) -> LauncherResult<Vec<u8>>;
    fn decrypt(&self, sealed: &[u8]) -> LauncherResult<Vec<u8>>;
}

pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> LauncherResult<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> LauncherResult<Vec<u8>>;
}

/// AES-128-GCM keyed by the 128-bit machine id. Output is the random
/// nonce followed by the ciphertext.
pub struct MachineCipher {
    key: [u8; 16],
}

fn missing_machine_id() -> LauncherError {
    LauncherError::UnsupportedPlatform("Missing machine ID.".into())
}

impl MachineCipher {
    pub fn from_key(key: [u8; 16]) -> Self {
        Self { key }
    }

    /// Derive the key from the host's machine id.
    pub async fn for_host(platform: &Platform, tools: &dyn ToolRunner) -> LauncherResult<Self> {
        let key = match platform.os {
            OsKind::Linux => {
                let raw = tokio::fs::read_to_string("/etc/machine-id")
                    .await
                    .map_err(|_| missing_machine_id())?;
                linux_machine_key(&raw)?
            }
            OsKind::Osx => {
                let output = tools
                    .run(&ToolCommand::new("ioreg").args(["-rd1", "-c", "IOPlatformExpertDevice"]))
                    .await
                    .map_err(|_| missing_machine_id())?;
                uuid_key(&MAC_UUID_REGEX, &output.stdout)?
            }
            OsKind::Windows => {
                let output = tools
                    .run(&ToolCommand::new("reg").args([
                        "query",
                        r"HKLM\SOFTWARE\Microsoft\Cryptography",
                        "/v",
                        "MachineGuid",
                    ]))
                    .await
                    .map_err(|_| missing_machine_id())?;
                uuid_key(&WINDOWS_GUID_REGEX, &output.stdout)?
            }
        };
        debug!("Machine key derived for {}", platform.os);
        Ok(Self { key })
    }
}

/// First 32 hex digits of `/etc/machine-id`.
fn linux_machine_key(raw: &str) -> LauncherResult<[u8; 16]> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let digits = line.get(..32).ok_or_else(missing_machine_id)?;
    let bytes = hex::decode(digits).map_err(|_| missing_machine_id())?;
    bytes.try_into().map_err(|_| missing_machine_id())
}

fn uuid_key(pattern: &Regex, output: &str) -> LauncherResult<[u8; 16]> {
    let raw = pattern
        .captures(output)
        .and_then(|caps| caps.get(1))
        .ok_or_else(missing_machine_id)?;
    let uuid = uuid::Uuid::parse_str(raw.as_str()).map_err(|_| missing_machine_id())?;
    Ok(*uuid.as_bytes())
}

impl Cipher for MachineCipher {
    fn encrypt(&self, plain: &[u8]) -> LauncherResult<Vec<u8>> {
        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&self.key));
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plain)
            .map_err(|_| LauncherError::Internal("Encryption failed.".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(&self, sealed: &[u8]) -> LauncherResult<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(LauncherError::Internal("Encrypted data is truncated.".into()));
        }
        let (nonce, body) = sealed.split_at(NONCE_LEN);
        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&self.key));
        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| LauncherError::Internal("Decryption failed.".into()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GzipCompressor;

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> LauncherResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, data: &[u8]) -> LauncherResult<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}
