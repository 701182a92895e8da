//! Account domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::currency::MicroUsd;
use crate::ports::PasswordHasher;

/// A ledger account
///
/// The password hash is only ever compared, never handed out: there is no
/// public getter and `Debug` redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    password_hash: String,
    pub balance: MicroUsd,
}

impl Account {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, balance: MicroUsd) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            balance,
        }
    }

    /// Check a plaintext password against the stored digest
    pub fn verify_password(&self, hasher: &dyn PasswordHasher, password: &str) -> bool {
        hasher.verify(password, &self.password_hash)
    }

    /// Caller-facing view without the credential
    pub fn view(&self) -> AccountView {
        AccountView {
            username: self.username.clone(),
            balance: self.balance.to_string(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("balance", &self.balance)
            .finish()
    }
}

/// What a request layer gets to display for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub username: String,
    /// Formatted dollar amount, e.g. "12.34"
    pub balance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_hash() {
        let account = Account::new("alice", "$argon2id$v=19$secret", MicroUsd::ZERO);
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_view_formats_balance() {
        let account = Account::new("bob", "hash", MicroUsd::parse("42.10").unwrap());
        let view = account.view();
        assert_eq!(view.username, "bob");
        assert_eq!(view.balance, "42.10");
    }
}
