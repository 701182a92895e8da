//! Cross-process lock on a ledger snapshot
//!
//! A process that works with a snapshot holds a `LedgerLock` on the sidecar
//! `<snapshot>.lock` file for as long as it keeps the ledger in memory. A
//! writer holds it exclusively from load until after its save, so another
//! process can never load a balance that is about to be rewritten. Readers
//! share it. Dropping the guard releases the lock.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::domain::result::{Error, Result};

/// How a ledger lock is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read-only access; any number of holders
    Shared,
    /// Load, mutate and save; a single holder
    Exclusive,
}

#[derive(Debug)]
pub struct LedgerLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl LedgerLock {
    /// Block until the lock guarding `snapshot` is held in `mode`
    pub fn acquire(snapshot: &Path, mode: LockMode) -> Result<Self> {
        let path = lock_path(snapshot);
        let file = open_lock_file(&path)?;

        match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        }
        .map_err(Error::IoFailure)?;

        tracing::debug!(path = %path.display(), ?mode, "ledger lock acquired");
        Ok(Self { file, path, mode })
    }

    /// Take the lock only if nobody holds a conflicting one
    pub fn try_acquire(snapshot: &Path, mode: LockMode) -> Result<Option<Self>> {
        let path = lock_path(snapshot);
        let file = open_lock_file(&path)?;

        let locked = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };
        match locked {
            Ok(()) => Ok(Some(Self { file, path, mode })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(Error::IoFailure(e)),
        }
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// True if this guard protects `snapshot`
    pub fn guards(&self, snapshot: &Path) -> bool {
        self.path == lock_path(snapshot)
    }

    /// Fail with `LockNotHeld` unless this guard lets the caller rewrite `snapshot`
    pub(crate) fn check_writable(&self, snapshot: &Path) -> Result<()> {
        if self.mode != LockMode::Exclusive || !self.guards(snapshot) {
            return Err(Error::LockNotHeld);
        }
        Ok(())
    }

    /// Fail with `LockNotHeld` unless this guard protects `snapshot`
    pub(crate) fn check_readable(&self, snapshot: &Path) -> Result<()> {
        if !self.guards(snapshot) {
            return Err(Error::LockNotHeld);
        }
        Ok(())
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        tracing::debug!(path = %self.path.display(), "ledger lock released");
    }
}

/// Sidecar lock file for a snapshot
pub(crate) fn lock_path(snapshot: &Path) -> PathBuf {
    let mut name = snapshot.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    snapshot.with_file_name(name)
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(Error::IoFailure)
}
