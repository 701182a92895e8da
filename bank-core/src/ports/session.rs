//! Session port - identity continuity between requests

use std::io;

use crate::domain::result::Result;

/// Name of the token on the transport (the cookie name in an HTTP deployment)
pub const SESSION_COOKIE: &str = "bank-session";

/// Absolute session lifetime: 15 minutes from issuance, no refresh
pub const SESSION_MAX_AGE_SECS: i64 = 900;

/// A token to attach to an outbound response
///
/// A non-positive `max_age` tells the client to discard the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub max_age: i64,
}

impl SessionCookie {
    pub fn new(value: impl Into<String>, max_age: i64) -> Self {
        Self {
            name: SESSION_COOKIE.to_string(),
            value: value.into(),
            max_age,
        }
    }

    /// An empty token that is already expired
    pub fn expired() -> Self {
        Self::new("", -1)
    }
}

/// Request/response transport able to round-trip an opaque token
pub trait TokenChannel {
    /// Token presented by the client on the inbound request
    fn token(&self, name: &str) -> Option<String>;

    /// Attach a token to the outbound response
    fn set_token(&mut self, cookie: SessionCookie) -> io::Result<()>;
}

/// Issues, reads and expires sessions bound to a validated username
pub trait SessionManager: Send + Sync {
    /// Start a session for `username`
    ///
    /// Fails with `InvalidUsername` for a bad name and `TokenWriteFailure`
    /// if the channel rejects the token.
    fn create(&self, channel: &mut dyn TokenChannel, username: &str) -> Result<()>;

    /// Username of the authenticated client
    ///
    /// `NotAuthenticated` if there is no valid, unexpired token;
    /// `CorruptSession` if the embedded username fails validation.
    fn get_user(&self, channel: &dyn TokenChannel) -> Result<String>;

    /// End the session. Expiring an already expired session is not an error.
    fn expire(&self, channel: &mut dyn TokenChannel) -> Result<()>;
}
