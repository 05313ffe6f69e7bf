//! Machine-bound license file.
//!
//! Obfuscation only: the file is XOR-ed with the machine fingerprint and
//! base64 encoded, and carries a SHA-256 signature of its own fields.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::Authorization;
use crate::config::{AuthorizationConfig, RunConfig};
use crate::errors::{AutoQuizError, AutoQuizResult};

pub const LICENSE_VERSION: &str = "3.0";
const CODE_MODULUS: u64 = 100_000_000;
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub fingerprint: String,
    pub activation_code: String,
    pub master_secret_hash: String,
    /// RFC 3339.
    pub creation_date: String,
    pub username: String,
    pub computer_name: String,
    pub license_version: String,
    pub app_name: String,
    #[serde(default)]
    pub signature: String,
}

impl LicenseRecord {
    /// SHA-256 over the key-sorted JSON of every field except `signature`.
    pub fn compute_signature(&self) -> AutoQuizResult<String> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("signature");
        }
        let canonical = canonical_json(&value);
        Ok(sha256_hex(canonical.as_bytes()))
    }
}

// ── Machine identity ────────────────────────────────────────────────────────

pub fn username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown-user".into())
}

pub fn computer_name() -> String {
    if let Ok(name) = std::env::var("COMPUTERNAME").or_else(|_| std::env::var("HOSTNAME")) {
        return name;
    }
    std::fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown-host".into())
}

/// SHA-256 of the sorted host identifiers.
pub fn machine_fingerprint() -> String {
    let mut ids = vec![
        format!("host:{}", computer_name()),
        format!("user:{}", username()),
        format!("os:{}-{}", std::env::consts::OS, std::env::consts::ARCH),
    ];
    ids.sort();
    sha256_hex(ids.join("|").as_bytes())
}

/// Eight-digit code: SHA-256(fingerprint + secret) as an integer, mod 10^8.
pub fn activation_code(fingerprint: &str, secret: &str) -> String {
    let digest = sha256_hex(format!("{fingerprint}{secret}").as_bytes());
    let code = digest
        .chars()
        .filter_map(|c| c.to_digit(16))
        .fold(0u64, |acc, d| (acc * 16 + d as u64) % CODE_MODULUS);
    format!("{code:08}")
}

// ── Authorization ───────────────────────────────────────────────────────────

pub struct LicenseAuthorization {
    path: PathBuf,
    app_name: String,
    fingerprint: String,
}

impl LicenseAuthorization {
    pub fn new(path: PathBuf, app_name: impl Into<String>) -> Self {
        Self::with_fingerprint(path, app_name, machine_fingerprint())
    }

    pub fn with_fingerprint(path: PathBuf, app_name: impl Into<String>, fingerprint: String) -> Self {
        Self {
            path,
            app_name: app_name.into(),
            fingerprint,
        }
    }

    pub fn from_config(config: &AuthorizationConfig, run: &RunConfig) -> Self {
        let dir = config
            .license_dir
            .clone()
            .unwrap_or_else(|| run.resolved_data_dir());
        Self::new(dir.join(&config.license_file), config.app_name.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Write a license when `code` is this machine's code for `secret`.
    pub fn activate(&self, secret: &str, code: &str) -> AutoQuizResult<LicenseRecord> {
        let expected = activation_code(&self.fingerprint, secret);
        if code.trim() != expected {
            return Err(AutoQuizError::License("activation code does not match this machine".into()));
        }

        let mut record = LicenseRecord {
            fingerprint: self.fingerprint.clone(),
            activation_code: expected,
            master_secret_hash: sha256_hex(secret.as_bytes()),
            creation_date: chrono::Utc::now().to_rfc3339(),
            username: username(),
            computer_name: computer_name(),
            license_version: LICENSE_VERSION.into(),
            app_name: self.app_name.clone(),
            signature: String::new(),
        };
        record.signature = record.compute_signature()?;

        let json = serde_json::to_string(&record)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, obfuscate(json.as_bytes(), &self.fingerprint))?;
        tracing::info!(path = %self.path.display(), "license written");
        Ok(record)
    }

    /// Decode and check the stored license against this machine.
    pub fn verify(&self) -> AutoQuizResult<LicenseRecord> {
        let encoded = std::fs::read_to_string(&self.path)
            .map_err(|e| AutoQuizError::License(format!("no license at {}: {e}", self.path.display())))?;
        let raw = deobfuscate(encoded.trim(), &self.fingerprint)?;
        let record: LicenseRecord = serde_json::from_slice(&raw)
            .map_err(|e| AutoQuizError::License(format!("license unreadable: {e}")))?;

        if record.fingerprint != self.fingerprint {
            return Err(AutoQuizError::License("license belongs to another machine".into()));
        }
        if record.license_version != LICENSE_VERSION {
            return Err(AutoQuizError::License(format!(
                "license version {} not supported",
                record.license_version
            )));
        }
        if record.compute_signature()? != record.signature {
            return Err(AutoQuizError::License("license signature mismatch".into()));
        }
        Ok(record)
    }
}

#[async_trait]
impl Authorization for LicenseAuthorization {
    async fn is_authorized(&self) -> bool {
        match self.verify() {
            Ok(record) => {
                tracing::info!(user = %record.username, created = %record.creation_date, "license valid");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "license check failed");
                false
            }
        }
    }
}

// ── Encoding helpers ────────────────────────────────────────────────────────

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Compact JSON with object keys in sorted order at every level.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::Value::String(k.clone()),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

fn xor_key(fingerprint: &str) -> Vec<u8> {
    fingerprint.bytes().take(KEY_LEN).collect()
}

fn xor(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect()
}

fn obfuscate(data: &[u8], fingerprint: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xor(data, &xor_key(fingerprint)))
}

fn deobfuscate(encoded: &str, fingerprint: &str) -> AutoQuizResult<Vec<u8>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AutoQuizError::License(format!("license encoding: {e}")))?;
    Ok(xor(&bytes, &xor_key(fingerprint)))
}
