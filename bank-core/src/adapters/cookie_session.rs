//! Stateless signed-cookie sessions
//!
//! The whole session lives in the client's cookie:
//!
//! ```text
//! base64url({"user":"alice","iat":1700000000}) "." base64url(HMAC-SHA256)
//! ```
//!
//! The MAC covers the cookie name and the encoded payload. The cookie carries
//! a max-age of 900 seconds, and the issue time inside the payload is checked
//! on every read so an old token is refused even if the client keeps it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::Sha256;
use tempfile::NamedTempFile;

use super::{system_clock, Clock};
use crate::domain::result::{Error, Result};
use crate::domain::validate;
use crate::ports::{SessionCookie, SessionManager, TokenChannel, SESSION_COOKIE, SESSION_MAX_AGE_SECS};

type HmacSha256 = Hmac<Sha256>;

/// Signing key length in bytes
pub const KEY_LEN: usize = 32;

#[derive(Serialize, Deserialize)]
struct Payload {
    user: JsonValue,
    iat: i64,
}

/// Session manager that keeps no server-side state
pub struct CookieSessionManager {
    key: [u8; KEY_LEN],
    max_age: i64,
    clock: Clock,
}

impl CookieSessionManager {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key,
            max_age: SESSION_MAX_AGE_SECS,
            clock: system_clock(),
        }
    }

    /// Manager with a fresh random key; tokens do not survive a restart
    pub fn generate() -> Self {
        Self::new(rand::thread_rng().gen())
    }

    /// Replace the time source (used to test expiry)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn mac(&self, encoded_payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length");
        mac.update(SESSION_COOKIE.as_bytes());
        mac.update(b"|");
        mac.update(encoded_payload.as_bytes());
        mac
    }

    fn encode(&self, username: &str) -> String {
        let payload = Payload {
            user: JsonValue::String(username.to_string()),
            iat: (self.clock)().timestamp(),
        };
        // Serializing a string and an integer cannot fail
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        let encoded = URL_SAFE_NO_PAD.encode(json);
        let tag = URL_SAFE_NO_PAD.encode(self.mac(&encoded).finalize().into_bytes());
        format!("{}.{}", encoded, tag)
    }

    /// Authenticate a token and return its payload
    fn decode(&self, token: &str) -> Option<Payload> {
        let (encoded, tag) = token.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        self.mac(encoded).verify_slice(&tag).ok()?;

        let json = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let payload: Payload = serde_json::from_slice(&json).ok()?;

        let age = (self.clock)().timestamp() - payload.iat;
        if age > self.max_age {
            tracing::debug!(age, "session token expired");
            return None;
        }
        Some(payload)
    }
}

impl SessionManager for CookieSessionManager {
    fn create(&self, channel: &mut dyn TokenChannel, username: &str) -> Result<()> {
        validate::username(username).map_err(Error::InvalidUsername)?;

        let cookie = SessionCookie::new(self.encode(username), self.max_age);
        channel.set_token(cookie).map_err(Error::TokenWriteFailure)?;
        Ok(())
    }

    fn get_user(&self, channel: &dyn TokenChannel) -> Result<String> {
        let token = channel
            .token(SESSION_COOKIE)
            .filter(|t| !t.is_empty())
            .ok_or(Error::NotAuthenticated)?;
        let payload = self.decode(&token).ok_or(Error::NotAuthenticated)?;

        let JsonValue::String(username) = payload.user else {
            return Err(Error::NotAuthenticated);
        };
        if validate::username(&username).is_err() {
            tracing::warn!("authenticated session carries an invalid username");
            return Err(Error::CorruptSession);
        }
        Ok(username)
    }

    fn expire(&self, channel: &mut dyn TokenChannel) -> Result<()> {
        channel
            .set_token(SessionCookie::expired())
            .map_err(Error::TokenWriteFailure)
    }
}

/// Read the signing key from `path`, creating a random one if it is missing
///
/// The key is stored hex-encoded so tokens stay valid across process restarts.
/// A new key is written to a temporary file and linked into place without
/// replacing anything, so concurrent first runs agree on one key and a reader
/// never sees a partial file.
pub fn load_or_create_key(path: &Path) -> AnyResult<[u8; KEY_LEN]> {
    if path.exists() {
        return read_key(path);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let key: [u8; KEY_LEN] = rand::thread_rng().gen();
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to write session key: {:?}", path))?;
    temp.write_all(hex::encode(key).as_bytes())?;
    temp.as_file().sync_all()?;

    match temp.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!(path = %path.display(), "generated new session key");
            Ok(key)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => read_key(path),
        Err(e) => Err(e.error).with_context(|| format!("Failed to write session key: {:?}", path)),
    }
}

fn read_key(path: &Path) -> AnyResult<[u8; KEY_LEN]> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session key: {:?}", path))?;
    let bytes = hex::decode(content.trim()).context("Session key is not valid hex")?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Session key must be {} bytes", KEY_LEN))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::adapters::CookieJar;

    const T0: i64 = 1_700_000_000;

    fn manager_at(clock: Arc<AtomicI64>) -> CookieSessionManager {
        CookieSessionManager::new([7u8; KEY_LEN]).with_clock(Arc::new(move || {
            chrono::DateTime::from_timestamp(clock.load(Ordering::SeqCst), 0).unwrap()
        }))
    }

    #[test]
    fn test_create_then_get_user() {
        let sessions = CookieSessionManager::generate();
        let mut jar = CookieJar::new();

        sessions.create(&mut jar, "alice").unwrap();
        assert_eq!(sessions.get_user(&jar).unwrap(), "alice");
        assert_eq!(jar.max_age(SESSION_COOKIE), Some(SESSION_MAX_AGE_SECS));
    }

    #[test]
    fn test_get_user_without_token() {
        let sessions = CookieSessionManager::generate();
        let jar = CookieJar::new();
        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_expire_logs_out_and_is_idempotent() {
        let sessions = CookieSessionManager::generate();
        let mut jar = CookieJar::new();

        sessions.create(&mut jar, "alice").unwrap();
        sessions.expire(&mut jar).unwrap();
        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));

        sessions.expire(&mut jar).unwrap();
        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_create_rejects_invalid_username() {
        let sessions = CookieSessionManager::generate();
        let mut jar = CookieJar::new();
        assert!(matches!(
            sessions.create(&mut jar, "Mallory"),
            Err(Error::InvalidUsername(_))
        ));
        assert!(jar.token(SESSION_COOKIE).is_none());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let sessions = CookieSessionManager::generate();
        let mut jar = CookieJar::new();
        sessions.create(&mut jar, "alice").unwrap();

        let token = jar.token(SESSION_COOKIE).unwrap();
        let (_, tag) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"user":"admin","iat":{}}}"#, chrono::Utc::now().timestamp()));
        jar.insert(SESSION_COOKIE, format!("{}.{}", forged_payload, tag));

        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let issuer = CookieSessionManager::new([1u8; KEY_LEN]);
        let verifier = CookieSessionManager::new([2u8; KEY_LEN]);
        let mut jar = CookieJar::new();

        issuer.create(&mut jar, "alice").unwrap();
        assert!(matches!(verifier.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_session_expires_after_max_age() {
        let now = Arc::new(AtomicI64::new(T0));
        let sessions = manager_at(Arc::clone(&now));
        let mut jar = CookieJar::new();
        sessions.create(&mut jar, "alice").unwrap();

        now.store(T0 + SESSION_MAX_AGE_SECS, Ordering::SeqCst);
        assert_eq!(sessions.get_user(&jar).unwrap(), "alice");

        now.store(T0 + SESSION_MAX_AGE_SECS + 1, Ordering::SeqCst);
        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    /// Sign an arbitrary payload with the manager's key
    fn signed(sessions: &CookieSessionManager, payload: &str) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let tag = URL_SAFE_NO_PAD.encode(sessions.mac(&encoded).finalize().into_bytes());
        format!("{}.{}", encoded, tag)
    }

    #[test]
    fn test_non_string_user_is_not_authenticated() {
        let now = Arc::new(AtomicI64::new(T0));
        let sessions = manager_at(now);
        let mut jar = CookieJar::new();
        jar.insert(SESSION_COOKIE, signed(&sessions, &format!(r#"{{"user":42,"iat":{}}}"#, T0)));

        assert!(matches!(sessions.get_user(&jar), Err(Error::NotAuthenticated)));
    }

    #[test]
    fn test_invalid_embedded_username_is_corrupt() {
        let now = Arc::new(AtomicI64::new(T0));
        let sessions = manager_at(now);
        let mut jar = CookieJar::new();
        jar.insert(SESSION_COOKIE, signed(&sessions, &format!(r#"{{"user":"Bad Name","iat":{}}}"#, T0)));

        assert!(matches!(sessions.get_user(&jar), Err(Error::CorruptSession)));
    }

    #[test]
    fn test_write_failure_surfaces() {
        let sessions = CookieSessionManager::generate();
        let mut jar = CookieJar::new();
        jar.fail_writes(true);

        assert!(matches!(
            sessions.create(&mut jar, "alice"),
            Err(Error::TokenWriteFailure(_))
        ));
        assert!(matches!(sessions.expire(&mut jar), Err(Error::TokenWriteFailure(_))));
    }

    #[test]
    fn test_key_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.key");

        let first = load_or_create_key(&path).unwrap();
        let second = load_or_create_key(&path).unwrap();
        assert_eq!(first, second);

        fs::write(&path, "zz").unwrap();
        assert!(load_or_create_key(&path).is_err());
    }

    #[test]
    fn test_racing_key_creation_agrees() {
        let dir = tempfile::tempdir().unwrap();
        let path = Arc::new(dir.path().join("session.key"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                std::thread::spawn(move || load_or_create_key(&path).unwrap())
            })
            .collect();
        let keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(keys.iter().all(|key| key == &keys[0]));
        assert_eq!(load_or_create_key(&path).unwrap(), keys[0]);
    }
}
