//! Deposit and withdraw commands

use anyhow::{Context, Result};
use bank_core::services::LockMode;
use bank_core::TransactionKind;

use super::{get_context, session_jar};
use crate::output;

pub fn run(token: Option<&str>, kind: TransactionKind, amount: &str, json: bool) -> Result<()> {
    let ctx = get_context(LockMode::Exclusive)?;
    let jar = session_jar(token);

    let balance = ctx
        .bank_service
        .transaction(&jar, kind, amount)
        .with_context(|| format!("Failed {}", kind))?;
    ctx.save()?;

    if json {
        return output::json(&serde_json::json!({
            "type": kind,
            "amount": amount,
            "balance": balance,
        }));
    }

    output::success(&format!("{} of {} complete", kind, amount));
    println!("  Balance: {}", balance);
    Ok(())
}
