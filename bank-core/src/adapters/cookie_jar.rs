//! In-memory token channel
//!
//! Behaves like a client's cookie store sitting on both sides of one
//! request: tokens inserted up front are "presented" to the server, tokens the
//! server sets replace them, and a non-positive max-age deletes the cookie.

use std::collections::HashMap;
use std::io;

use crate::ports::{SessionCookie, TokenChannel};

#[derive(Debug, Default, Clone)]
pub struct CookieJar {
    cookies: HashMap<String, SessionCookie>,
    last_written: Option<SessionCookie>,
    fail_writes: bool,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jar presenting a single token under `name`
    pub fn with_token(name: &str, value: impl Into<String>) -> Self {
        let mut jar = Self::new();
        jar.insert(name, value);
        jar
    }

    /// Store a token as if the client had sent it
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.cookies.insert(
            name.to_string(),
            SessionCookie {
                name: name.to_string(),
                value: value.into(),
                max_age: 0,
            },
        );
    }

    /// Max-age of a live cookie as last set by the server
    pub fn max_age(&self, name: &str) -> Option<i64> {
        self.cookies.get(name).map(|c| c.max_age)
    }

    /// Last cookie the server wrote, including expiring ones
    pub fn last_written(&self) -> Option<&SessionCookie> {
        self.last_written.as_ref()
    }

    /// Make every subsequent `set_token` fail, to simulate a broken transport
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl TokenChannel for CookieJar {
    fn token(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|c| c.value.clone())
    }

    fn set_token(&mut self, cookie: SessionCookie) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response already sent"));
        }

        if cookie.max_age <= 0 {
            self.cookies.remove(&cookie.name);
        } else {
            self.cookies.insert(cookie.name.clone(), cookie.clone());
        }
        self.last_written = Some(cookie);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_max_age_deletes() {
        let mut jar = CookieJar::with_token("bank-session", "abc");
        assert_eq!(jar.token("bank-session").as_deref(), Some("abc"));

        jar.set_token(SessionCookie::expired()).unwrap();
        assert!(jar.token("bank-session").is_none());
        assert_eq!(jar.last_written().unwrap().max_age, -1);
    }

    #[test]
    fn test_set_token_replaces() {
        let mut jar = CookieJar::with_token("bank-session", "old");
        jar.set_token(SessionCookie::new("new", 900)).unwrap();
        assert_eq!(jar.token("bank-session").as_deref(), Some("new"));
        assert_eq!(jar.max_age("bank-session"), Some(900));
    }
}
