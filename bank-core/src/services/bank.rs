//! Bank service - the request flows a thin transport layer calls
//!
//! Each method corresponds to one user action (sign up, log in, view the
//! account, move money, log out). The session only ever carries a username;
//! the account itself is always re-read from the store.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::AccountStore;
use crate::domain::result::{Error, Result};
use crate::domain::{validate, AccountView, MicroUsd};
use crate::ports::{SessionManager, TokenChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            _ => Err(Error::UnknownTransaction),
        }
    }
}

pub struct BankService {
    store: Arc<AccountStore>,
    sessions: Arc<dyn SessionManager>,
}

impl BankService {
    pub fn new(store: Arc<AccountStore>, sessions: Arc<dyn SessionManager>) -> Self {
        Self { store, sessions }
    }

    /// Whether the channel carries a valid session
    pub fn is_logged_in(&self, channel: &dyn TokenChannel) -> bool {
        self.sessions.get_user(channel).is_ok()
    }

    /// Create an account with an opening balance and log the new user in
    pub fn signup(
        &self,
        channel: &mut dyn TokenChannel,
        username: &str,
        password: &str,
        balance: &str,
    ) -> Result<AccountView> {
        validate::username(username).map_err(Error::InvalidUsername)?;
        validate::password(password).map_err(Error::InvalidPassword)?;
        let balance = MicroUsd::parse(balance)?;

        self.store.add_account(username, password, balance)?;
        self.sessions.create(channel, username)?;

        Ok(self.store.get_account(username)?.view())
    }

    pub fn login(
        &self,
        channel: &mut dyn TokenChannel,
        username: &str,
        password: &str,
    ) -> Result<AccountView> {
        let account = match self.store.verify_credentials(username, password) {
            Ok(account) => account,
            Err(e) => {
                tracing::warn!(user = username, error = %e, "failed login");
                return Err(e);
            }
        };

        self.sessions.create(channel, &account.username)?;
        tracing::info!(user = %account.username, "logged in");
        Ok(account.view())
    }

    /// Account of the logged-in user
    pub fn account(&self, channel: &dyn TokenChannel) -> Result<AccountView> {
        let username = self.sessions.get_user(channel)?;
        Ok(self.store.get_account(&username)?.view())
    }

    /// Apply a deposit or withdrawal and return the new formatted balance
    pub fn transaction(
        &self,
        channel: &dyn TokenChannel,
        kind: TransactionKind,
        amount: &str,
    ) -> Result<String> {
        let username = self.sessions.get_user(channel)?;
        let amount = MicroUsd::parse(amount)?;

        match kind {
            TransactionKind::Deposit => self.store.deposit(&username, amount)?,
            TransactionKind::Withdraw => self.store.withdraw(&username, amount)?,
        }

        let balance = self.store.get_account(&username)?.balance.to_string();
        tracing::debug!(user = %username, kind = %kind, balance = %balance, "updated balance");
        Ok(balance)
    }

    pub fn logout(&self, channel: &mut dyn TokenChannel) -> Result<()> {
        let username = self.sessions.get_user(channel)?;
        self.sessions.expire(channel)?;
        tracing::info!(user = %username, "logged out");
        Ok(())
    }
}
