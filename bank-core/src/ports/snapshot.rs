//! Snapshot port - byte encoding of the whole ledger

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::Account;

/// Bumped whenever the snapshot layout changes incompatibly
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Full point-in-time copy of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub accounts: BTreeMap<String, Account>,
}

impl Snapshot {
    pub fn new(accounts: BTreeMap<String, Account>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            accounts,
        }
    }
}

/// Byte-serialization capability for snapshots
///
/// `decode` returns `Error::CorruptSnapshot` for anything it cannot read.
pub trait SnapshotCodec: Send + Sync {
    /// Short name used in logs and config ("bincode", "json")
    fn name(&self) -> &'static str;

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot>;
}
