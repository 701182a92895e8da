//! Account command - show the logged-in account

use anyhow::{Context, Result};
use bank_core::services::LockMode;
use colored::Colorize;

use super::{get_context, session_jar};
use crate::output;

pub fn run(token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context(LockMode::Shared)?;
    let jar = session_jar(token);

    let view = ctx
        .bank_service
        .account(&jar)
        .context("Could not read account")?;

    if json {
        return output::json(&view);
    }

    println!("{}", "Account".bold());
    println!("  User:    {}", view.username);
    println!("  Balance: {}", view.balance.bold());
    Ok(())
}
