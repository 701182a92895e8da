//! CLI command implementations

pub mod account;
pub mod auth;
pub mod config;
pub mod transaction;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bank_core::adapters::CookieJar;
use bank_core::ports::{TokenChannel, SESSION_COOKIE};
use bank_core::services::LockMode;
use bank_core::BankContext;

/// Get the bank directory from environment or default
pub fn get_bank_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bank"))
        .context("Could not find home directory; set BANK_DIR")
}

/// Bank directory, created if missing
pub fn ensure_bank_dir() -> Result<PathBuf> {
    let bank_dir = get_bank_dir()?;
    tracing::debug!(dir = %bank_dir.display(), "using bank directory");

    std::fs::create_dir_all(&bank_dir)
        .with_context(|| format!("Failed to create bank directory: {:?}", bank_dir))?;
    Ok(bank_dir)
}

/// Build the context and load the ledger
///
/// Commands that change balances ask for `Exclusive` and keep the context
/// until after `save`; the others share the ledger with concurrent readers.
pub fn get_context(mode: LockMode) -> Result<BankContext> {
    let bank_dir = ensure_bank_dir()?;
    BankContext::open(&bank_dir, mode).context("Failed to initialize bank context")
}

/// Channel presenting the caller's token, if any
pub fn session_jar(token: Option<&str>) -> CookieJar {
    match token {
        Some(token) => CookieJar::with_token(SESSION_COOKIE, token),
        None => CookieJar::new(),
    }
}

/// Token the server handed back during this request
pub fn issued_token(jar: &CookieJar) -> Option<String> {
    jar.token(SESSION_COOKIE)
        .filter(|_| jar.last_written().is_some())
}

/// Use the given password or ask for it interactively
pub fn read_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords don't match");
    }
    prompt.interact().context("Failed to read password")
}
