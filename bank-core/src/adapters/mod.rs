//! Adapter implementations (hexagonal architecture)
//!
//! Concrete implementations of the port traits.

mod argon2_hasher;
pub mod cookie_jar;
pub mod cookie_session;
pub mod memory_session;
pub mod snapshot_codec;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use argon2_hasher::Argon2Hasher;
pub use cookie_jar::CookieJar;
pub use cookie_session::CookieSessionManager;
pub use memory_session::MemorySessionStore;
pub use snapshot_codec::{BincodeCodec, JsonCodec};

/// Time source for session expiry
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
