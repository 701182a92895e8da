//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod account;
pub mod currency;
pub mod result;
pub mod validate;

pub use account::{Account, AccountView};
pub use currency::{CurrencyError, MicroUsd};
pub use validate::ValidationError;
