//! Config command - show or change settings.json

use anyhow::{Context, Result};
use bank_core::config::{Config, SessionBackend};
use colored::Colorize;

use super::ensure_bank_dir;
use crate::output;

pub fn run(strict_load: Option<bool>, session_backend: Option<SessionBackend>, json: bool) -> Result<()> {
    let bank_dir = ensure_bank_dir()?;
    let mut config = Config::load(&bank_dir).context("Could not read settings")?;

    let changed = strict_load.is_some() || session_backend.is_some();
    if let Some(strict_load) = strict_load {
        config.strict_load = strict_load;
    }
    if let Some(backend) = session_backend {
        config.session_backend = backend;
    }
    if changed {
        config.save(&bank_dir).context("Could not save settings")?;
    }

    if json {
        return output::json(&serde_json::json!({
            "snapshotFile": config.snapshot_file,
            "snapshotFormat": config.snapshot_format,
            "strictLoad": config.strict_load,
            "sessionBackend": config.session_backend,
        }));
    }

    if changed {
        output::success("Settings updated");
    }
    println!("{}", "Settings".bold());
    println!("  Snapshot:        {}", config.snapshot_path(&bank_dir).display());
    println!("  Format:          {:?}", config.snapshot_format);
    println!("  Strict load:     {}", config.strict_load);
    println!("  Session backend: {:?}", config.session_backend);
    Ok(())
}
