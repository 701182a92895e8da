//! Bank Core - account ledger, persistence and sessions
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Money, validation rules, accounts, errors
//! - **ports**: Trait definitions for consumed capabilities (hashing, snapshot encoding, sessions)
//! - **services**: The account store and the request flows built on it
//! - **adapters**: Concrete implementations (Argon2, bincode/JSON, signed cookies, ...)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::{cookie_session, Argon2Hasher, BincodeCodec, CookieSessionManager, JsonCodec, MemorySessionStore};
use config::{Config, SessionBackend, SnapshotFormat};
use ports::{SessionManager, SnapshotCodec};
use services::{AccountStore, BankService, LedgerLock, LockMode};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as BankResult};
pub use domain::{Account, AccountView, MicroUsd};
pub use services::TransactionKind;

/// Main context for bank operations
///
/// Built once per process and handed to whatever serves requests. Holds the
/// ledger, the session manager and the flows that combine them, plus the
/// ledger lock taken before the snapshot was read. The lock is released when
/// the context is dropped, so a writer's load, mutations and save form one
/// critical section against every other process on the same bank directory.
pub struct BankContext {
    pub config: Config,
    pub bank_dir: PathBuf,
    pub store: Arc<AccountStore>,
    pub sessions: Arc<dyn SessionManager>,
    pub bank_service: BankService,
    ledger_lock: LedgerLock,
}

impl BankContext {
    /// Create a writable context and hydrate the ledger
    ///
    /// Blocks until no other context holds the ledger of `bank_dir`.
    pub fn new(bank_dir: &Path) -> Result<Self> {
        Self::open(bank_dir, LockMode::Exclusive)
    }

    /// Create a context holding the ledger lock in `mode`
    ///
    /// A missing snapshot is a first run. A snapshot that exists but can't be
    /// decoded is fatal under `strict_load`; otherwise a writable context moves
    /// it aside and starts empty, and a read-only one just starts empty.
    /// `save` on a `Shared` context fails with `LockNotHeld`.
    pub fn open(bank_dir: &Path, mode: LockMode) -> Result<Self> {
        let config = Config::load(bank_dir)?;
        let snapshot_path = config.snapshot_path(bank_dir);
        let ledger_lock = LedgerLock::acquire(&snapshot_path, mode)
            .with_context(|| format!("Failed to lock ledger {:?}", snapshot_path))?;

        let codec: Arc<dyn SnapshotCodec> = match config.snapshot_format {
            SnapshotFormat::Bincode => Arc::new(BincodeCodec),
            SnapshotFormat::Json => Arc::new(JsonCodec),
        };
        let store = Arc::new(AccountStore::new(Arc::new(Argon2Hasher::new()), codec));

        let sessions: Arc<dyn SessionManager> = match config.session_backend {
            SessionBackend::Cookie => {
                let key = cookie_session::load_or_create_key(&config.session_key_path(bank_dir))?;
                Arc::new(CookieSessionManager::new(key))
            }
            SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        };

        let bank_service = BankService::new(Arc::clone(&store), Arc::clone(&sessions));
        let ctx = Self {
            config,
            bank_dir: bank_dir.to_path_buf(),
            store,
            sessions,
            bank_service,
            ledger_lock,
        };
        ctx.load()?;
        Ok(ctx)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.snapshot_path(&self.bank_dir)
    }

    pub fn lock_mode(&self) -> LockMode {
        self.ledger_lock.mode()
    }

    /// Load the ledger snapshot, tolerating a first run
    fn load(&self) -> Result<()> {
        let path = self.snapshot_path();
        match self.store.load_locked(&path, &self.ledger_lock) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::info!(path = %path.display(), "no snapshot found, starting with an empty ledger");
                Ok(())
            }
            Err(Error::CorruptSnapshot) if !self.config.strict_load => {
                if self.lock_mode() == LockMode::Exclusive {
                    let backup = services::quarantine_snapshot(&path, &self.ledger_lock)
                        .with_context(|| format!("Failed to move corrupt ledger {:?} aside", path))?;
                    tracing::warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        "snapshot is corrupt, starting with an empty ledger"
                    );
                } else {
                    tracing::warn!(path = %path.display(), "snapshot is corrupt, reading an empty ledger");
                }
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to load ledger from {:?}", path)),
        }
    }

    /// Persist the ledger; call once after the last request is drained
    pub fn save(&self) -> Result<()> {
        let path = self.snapshot_path();
        self.store
            .save_locked(&path, &self.ledger_lock)
            .with_context(|| format!("Failed to save ledger to {:?}", path))
    }
}
