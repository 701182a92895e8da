//! Currency domain model
//!
//! Money is counted in micro-dollars (1/1000 of a cent) as an exact integer.
//! Amounts enter the system as text like `"12.34"` and are converted digit by
//! digit, so no floating point value ever touches a balance.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base units per cent
const MICROS_PER_CENT: i64 = 1_000;

/// Base units per dollar
pub const MICROS_PER_DOLLAR: i64 = 100 * MICROS_PER_CENT;

/// Largest amount the parser accepts: 4294967295.99
const MAX_PARSE_CENTS: u64 = 429_496_729_599;

/// Integer part without leading zeros, a literal point, exactly two digits
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9][0-9]*)\.([0-9]{2})$").expect("amount pattern is valid")
});

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("invalid syntax")]
    InvalidSyntax,

    #[error("amount out of bounds")]
    OutOfBounds,
}

/// A non-negative amount of US dollars in 1/1000-cent units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MicroUsd(i64);

impl MicroUsd {
    pub const ZERO: MicroUsd = MicroUsd(0);

    /// Parse a dollar amount such as `"0.50"` or `"1200.00"`
    pub fn parse(text: &str) -> Result<Self, CurrencyError> {
        let caps = AMOUNT_RE
            .captures(text)
            .ok_or(CurrencyError::InvalidSyntax)?;

        // Syntax is already valid here, so a failed parse means too many digits
        let dollars: u64 = caps[1].parse().map_err(|_| CurrencyError::OutOfBounds)?;
        let cents: u64 = caps[2].parse().map_err(|_| CurrencyError::InvalidSyntax)?;

        let total_cents = dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .ok_or(CurrencyError::OutOfBounds)?;
        if total_cents > MAX_PARSE_CENTS {
            return Err(CurrencyError::OutOfBounds);
        }

        // MAX_PARSE_CENTS * 1000 fits comfortably in an i64
        Ok(Self(total_cents as i64 * MICROS_PER_CENT))
    }

    /// Build an amount from a raw micro-dollar count
    pub fn from_micros(micros: i64) -> Result<Self, CurrencyError> {
        if micros < 0 {
            return Err(CurrencyError::OutOfBounds);
        }
        Ok(Self(micros))
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: MicroUsd) -> Option<MicroUsd> {
        self.0.checked_add(other.0).map(Self)
    }

    /// `None` when the result would be negative
    pub fn checked_sub(self, other: MicroUsd) -> Option<MicroUsd> {
        if other.0 > self.0 {
            return None;
        }
        Some(Self(self.0 - other.0))
    }
}

impl fmt::Display for MicroUsd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Round any sub-cent remainder half-up
        let mut cents = self.0 / MICROS_PER_CENT;
        if self.0 % MICROS_PER_CENT >= MICROS_PER_CENT / 2 {
            cents += 1;
        }
        write!(f, "{}.{:02}", cents / 100, cents % 100)
    }
}

impl FromStr for MicroUsd {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i64> for MicroUsd {
    type Error = CurrencyError;

    fn try_from(micros: i64) -> Result<Self, Self::Error> {
        Self::from_micros(micros)
    }
}

impl From<MicroUsd> for i64 {
    fn from(amount: MicroUsd) -> Self {
        amount.0
    }
}
