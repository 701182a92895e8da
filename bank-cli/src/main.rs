//! Bank CLI - a thin request layer over the ledger core
//!
//! Every invocation is one request: load the ledger, run the command, save.

use std::process::ExitCode;

use anyhow::Result;
use bank_core::config::SessionBackend;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, auth, config, transaction};

/// Bank - a minimal account ledger
#[derive(Parser)]
#[command(name = "bank", version, about, long_about = None)]
struct Cli {
    /// Session token from a previous signup or login
    #[arg(long, global = true, env = "BANK_SESSION", hide_env_values = true)]
    token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        username: String,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Opening balance, e.g. 100.00
        #[arg(long, default_value = "0.00")]
        balance: String,
    },

    /// Log in to an existing account
    Login {
        username: String,
        /// Password (prompted if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Show the logged-in account
    Account,

    /// Deposit money
    Deposit {
        /// Amount, e.g. 12.34
        amount: String,
    },

    /// Withdraw money
    Withdraw {
        /// Amount, e.g. 12.34
        amount: String,
    },

    /// End the current session
    Logout,

    /// Show settings, or change them with the flags below
    Config {
        /// Refuse to start on an undecodable snapshot
        #[arg(long)]
        strict_load: Option<bool>,
        /// Where sessions are kept
        #[arg(long, value_enum)]
        session_backend: Option<BackendArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Cookie,
    Memory,
}

impl From<BackendArg> for SessionBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cookie => SessionBackend::Cookie,
            BackendArg::Memory => SessionBackend::Memory,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let token = cli.token.as_deref();
    match cli.command {
        Commands::Signup { username, password, balance } => {
            auth::signup(&username, password, &balance, cli.json)
        }
        Commands::Login { username, password } => auth::login(&username, password, cli.json),
        Commands::Account => account::run(token, cli.json),
        Commands::Deposit { amount } => {
            transaction::run(token, bank_core::TransactionKind::Deposit, &amount, cli.json)
        }
        Commands::Withdraw { amount } => {
            transaction::run(token, bank_core::TransactionKind::Withdraw, &amount, cli.json)
        }
        Commands::Logout => auth::logout(token, cli.json),
        Commands::Config { strict_load, session_backend } => {
            config::run(strict_load, session_backend.map(Into::into), cli.json)
        }
    }
}
