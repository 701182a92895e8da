//! Configuration management
//!
//! Settings live in `settings.json` inside the bank directory:
//! ```json
//! {
//!   "ledger": { "snapshotFile": "db.bin", "snapshotFormat": "bincode", "strictLoad": true },
//!   "sessions": { "backend": "cookie" }
//! }
//! ```
//! Every field is optional; keys this crate does not know about are kept
//! when the file is saved back. A file that is not valid JSON for this shape
//! is rejected rather than replaced by defaults.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(default)]
    sessions: SessionSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default = "default_snapshot_file")]
    snapshot_file: String,
    #[serde(default)]
    snapshot_format: SnapshotFormat,
    #[serde(default = "default_strict_load")]
    strict_load: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            snapshot_file: default_snapshot_file(),
            snapshot_format: SnapshotFormat::default(),
            strict_load: default_strict_load(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default)]
    backend: SessionBackend,
}

fn default_snapshot_file() -> String {
    "db.bin".to_string()
}

fn default_strict_load() -> bool {
    true
}

/// Encoding used for the ledger snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Bincode,
    Json,
}

/// Where session state lives
///
/// `Memory` sessions only make sense for a long-running process; they are
/// lost on exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    Cookie,
    Memory,
}

const SETTINGS_FILE: &str = "settings.json";
const STRICT_LOAD_ENV: &str = "BANK_STRICT_LOAD";

/// Bank configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub snapshot_file: String,
    pub snapshot_format: SnapshotFormat,
    /// Refuse to start when an existing snapshot can't be decoded
    pub strict_load: bool,
    pub session_backend: SessionBackend,
    strict_load_env: Option<bool>,
    raw: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(SettingsFile::default(), None)
    }
}

impl Config {
    fn from_raw(raw: SettingsFile, strict_load_env: Option<bool>) -> Self {
        Self {
            snapshot_file: raw.ledger.snapshot_file.clone(),
            snapshot_format: raw.ledger.snapshot_format,
            strict_load: strict_load_env.unwrap_or(raw.ledger.strict_load),
            session_backend: raw.sessions.backend,
            strict_load_env,
            raw,
        }
    }

    /// Load config from the bank directory
    ///
    /// A missing settings file means defaults; a malformed one is an error, so
    /// a typo never silently switches the codec or the load policy. Strict
    /// loading can be overridden with the BANK_STRICT_LOAD environment variable.
    pub fn load(bank_dir: &Path) -> Result<Self> {
        let raw = read_settings(&bank_dir.join(SETTINGS_FILE))?;
        let strict_load_env = match std::env::var(STRICT_LOAD_ENV).ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => Some(true),
            Some("false" | "0" | "no" | "FALSE" | "NO") => Some(false),
            _ => None,
        };
        Ok(Self::from_raw(raw, strict_load_env))
    }

    /// Write the settings back to the bank directory
    ///
    /// Keys this crate doesn't manage are written back untouched. A
    /// `strict_load` value that only came from the environment is not persisted.
    pub fn save(&self, bank_dir: &Path) -> Result<()> {
        let mut settings = self.raw.clone();
        settings.ledger.snapshot_file = self.snapshot_file.clone();
        settings.ledger.snapshot_format = self.snapshot_format;
        if self.strict_load_env != Some(self.strict_load) {
            settings.ledger.strict_load = self.strict_load;
        }
        settings.sessions.backend = self.session_backend;

        let path = bank_dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(&settings)?;
        let mut temp = NamedTempFile::new_in(bank_dir)
            .with_context(|| format!("Failed to write settings: {:?}", path))?;
        temp.write_all(content.as_bytes())?;
        temp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write settings: {:?}", path))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Absolute location of the snapshot file
    pub fn snapshot_path(&self, bank_dir: &Path) -> PathBuf {
        bank_dir.join(&self.snapshot_file)
    }

    /// Location of the cookie signing key
    pub fn session_key_path(&self, bank_dir: &Path) -> PathBuf {
        bank_dir.join("session.key")
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Malformed settings file: {:?}", path))
}
