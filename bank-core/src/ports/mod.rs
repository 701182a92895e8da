//! Port definitions (hexagonal architecture)
//!
//! Ports define the capabilities the ledger consumes. The store and the
//! request flows depend only on these traits, not on concrete implementations.

mod hasher;
mod session;
mod snapshot;

pub use hasher::PasswordHasher;
pub use session::{SessionCookie, SessionManager, TokenChannel, SESSION_COOKIE, SESSION_MAX_AGE_SECS};
pub use snapshot::{Snapshot, SnapshotCodec, SNAPSHOT_FORMAT_VERSION};
