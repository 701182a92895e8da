//! Server-side session store
//!
//! The cookie only carries a random session id; the username and expiry live
//! in a map on the server. Drop-in alternative to `CookieSessionManager` for a
//! long-running process that wants to revoke sessions server-side.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;

use super::{system_clock, Clock};
use crate::domain::result::{Error, Result};
use crate::domain::validate;
use crate::ports::{SessionCookie, SessionManager, TokenChannel, SESSION_COOKIE, SESSION_MAX_AGE_SECS};

struct Entry {
    username: String,
    expires_at: DateTime<Utc>,
}

pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    max_age: i64,
    clock: Clock,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_age: SESSION_MAX_AGE_SECS,
            clock: system_clock(),
        }
    }

    /// Replace the time source (used to test expiry)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Number of sessions currently held, expired ones included until pruned
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn new_id() -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        hex::encode(bytes)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager for MemorySessionStore {
    fn create(&self, channel: &mut dyn TokenChannel, username: &str) -> Result<()> {
        validate::username(username).map_err(Error::InvalidUsername)?;

        let now = (self.clock)();
        let id = Self::new_id();
        {
            let mut sessions = self.sessions.lock();
            sessions.retain(|_, entry| entry.expires_at > now);
            sessions.insert(
                id.clone(),
                Entry {
                    username: username.to_string(),
                    expires_at: now + Duration::seconds(self.max_age),
                },
            );
        }

        if let Err(e) = channel.set_token(SessionCookie::new(id.clone(), self.max_age)) {
            self.sessions.lock().remove(&id);
            return Err(Error::TokenWriteFailure(e));
        }
        Ok(())
    }

    fn get_user(&self, channel: &dyn TokenChannel) -> Result<String> {
        let id = channel.token(SESSION_COOKIE).ok_or(Error::NotAuthenticated)?;

        let now = (self.clock)();
        let mut sessions = self.sessions.lock();
        let entry = sessions.get(&id).ok_or(Error::NotAuthenticated)?;
        if entry.expires_at < now {
            sessions.remove(&id);
            return Err(Error::NotAuthenticated);
        }

        if validate::username(&entry.username).is_err() {
            return Err(Error::CorruptSession);
        }
        Ok(entry.username.clone())
    }

    fn expire(&self, channel: &mut dyn TokenChannel) -> Result<()> {
        if let Some(id) = channel.token(SESSION_COOKIE) {
            self.sessions.lock().remove(&id);
        }
        channel
            .set_token(SessionCookie::expired())
            .map_err(Error::TokenWriteFailure)
    }
}
