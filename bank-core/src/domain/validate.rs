//! Username and password syntax rules
//!
//! Anything that becomes a store key or is embedded in a session token must
//! pass these checks first.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const MIN_LEN: usize = 1;
const MAX_LEN: usize = 127;

static TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_\-.0-9a-z]+$").expect("text pattern is valid"));

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid length")]
    InvalidLength,

    #[error("invalid syntax")]
    InvalidSyntax,
}

pub fn username(username: &str) -> Result<(), ValidationError> {
    text(username)
}

pub fn password(password: &str) -> Result<(), ValidationError> {
    text(password)
}

fn text(text: &str) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(ValidationError::InvalidLength);
    }

    if !TEXT_RE.is_match(text) {
        return Err(ValidationError::InvalidSyntax);
    }

    Ok(())
}
