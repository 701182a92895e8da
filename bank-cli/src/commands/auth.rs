//! Signup, login and logout commands

use anyhow::{Context, Result};
use bank_core::services::LockMode;
use colored::Colorize;
use serde::Serialize;

use super::{get_context, issued_token, read_password, session_jar};
use crate::output;

#[derive(Serialize)]
struct SessionOutput {
    username: String,
    balance: String,
    token: Option<String>,
}

fn print_session(result: SessionOutput, headline: &str, json: bool) -> Result<()> {
    if json {
        return output::json(&result);
    }

    output::success(headline);
    println!("  User:    {}", result.username);
    println!("  Balance: {}", result.balance.bold());
    if let Some(token) = &result.token {
        println!();
        output::info("Session token (valid for 15 minutes):");
        println!("  export BANK_SESSION={}", token);
    }
    Ok(())
}

pub fn signup(username: &str, password: Option<String>, balance: &str, json: bool) -> Result<()> {
    let password = read_password(password, true)?;
    let ctx = get_context(LockMode::Exclusive)?;
    let mut jar = session_jar(None);

    let view = ctx
        .bank_service
        .signup(&mut jar, username, &password, balance)
        .context("Signup failed")?;
    ctx.save()?;

    print_session(
        SessionOutput {
            username: view.username,
            balance: view.balance,
            token: issued_token(&jar),
        },
        "Account created",
        json,
    )
}

pub fn login(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = read_password(password, false)?;
    let ctx = get_context(LockMode::Shared)?;
    let mut jar = session_jar(None);

    let view = ctx
        .bank_service
        .login(&mut jar, username, &password)
        .context("Login failed")?;

    print_session(
        SessionOutput {
            username: view.username,
            balance: view.balance,
            token: issued_token(&jar),
        },
        "Logged in",
        json,
    )
}

pub fn logout(token: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context(LockMode::Shared)?;
    let mut jar = session_jar(token);

    ctx.bank_service.logout(&mut jar).context("Logout failed")?;

    if json {
        return output::json(&serde_json::json!({ "loggedOut": true }));
    }
    output::success("Logged out");
    println!("  unset BANK_SESSION");
    Ok(())
}
