//! Result and error types for the core library
//!
//! The taxonomy is closed: callers match on the variant to pick a response and
//! never need to look at library-specific detail. Display strings are safe to
//! show to an end user; raw hashing/serialization errors are logged where they
//! happen and never carried in the message.

use thiserror::Error;

use super::currency::CurrencyError;
use super::validate::ValidationError;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid syntax")]
    InvalidSyntax,

    #[error("amount out of bounds")]
    OutOfBounds,

    #[error("invalid username: {0}")]
    InvalidUsername(#[source] ValidationError),

    #[error("invalid password: {0}")]
    InvalidPassword(#[source] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("account already exists")]
    AlreadyExists,

    #[error("amount to withdraw is greater than current balance")]
    InsufficientFunds,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unknown transaction type")]
    UnknownTransaction,

    #[error("could not hash password")]
    HashingFailure,

    #[error("client not logged in")]
    NotAuthenticated,

    #[error("session contains invalid username")]
    CorruptSession,

    #[error("snapshot is corrupt")]
    CorruptSnapshot,

    #[error("ledger lock not held for this operation")]
    LockNotHeld,

    #[error("I/O failure")]
    IoFailure(#[source] std::io::Error),

    #[error("could not write session token")]
    TokenWriteFailure(#[source] std::io::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// True for any `NotFound`, including a missing snapshot file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<CurrencyError> for Error {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::InvalidSyntax => Self::InvalidSyntax,
            CurrencyError::OutOfBounds => Self::OutOfBounds,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
