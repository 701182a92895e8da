//! Snapshot codecs: bincode (default) and JSON

use std::io;

use crate::domain::result::{Error, Result};
use crate::ports::{Snapshot, SnapshotCodec};

/// Compact binary snapshots
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl SnapshotCodec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        bincode::serialize(snapshot).map_err(|e| {
            tracing::error!(error = %e, "failed to encode snapshot");
            Error::IoFailure(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot> {
        bincode::deserialize(bytes).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode bincode snapshot");
            Error::CorruptSnapshot
        })
    }
}

/// Human-readable snapshots, handy for inspecting a ledger by hand
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(snapshot).map_err(|e| {
            tracing::error!(error = %e, "failed to encode snapshot");
            Error::IoFailure(io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<Snapshot> {
        serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode json snapshot");
            Error::CorruptSnapshot
        })
    }
}
