//! Account store - the in-memory ledger and its snapshot persistence
//!
//! Locking discipline:
//! - the map sits behind an `RwLock`, each account behind its own `Mutex`
//! - deposit/withdraw/get hold the map read lock plus the account mutex, so
//!   different accounts proceed in parallel and one account is strictly
//!   serialized
//! - add, load and save hold the map write lock, so a snapshot never sees a
//!   half-applied mutation and nobody observes a half-replaced map
//!
//! Across processes the snapshot file is guarded by a `LedgerLock`. `load`
//! and `save` take it for their own duration; a caller running a whole
//! load/mutate/save cycle holds one guard and uses the `*_locked` variants.
//!
//! Durability only happens at `save`. Anything mutated after the last save is
//! lost if the process dies before the next one.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;

use super::ledger_lock::{LedgerLock, LockMode};

use crate::domain::result::{Error, Result};
use crate::domain::{validate, Account, MicroUsd};
use crate::ports::{PasswordHasher, Snapshot, SnapshotCodec, SNAPSHOT_FORMAT_VERSION};

type Slot = Arc<Mutex<Account>>;

pub struct AccountStore {
    accounts: RwLock<HashMap<String, Slot>>,
    hasher: Arc<dyn PasswordHasher>,
    codec: Arc<dyn SnapshotCodec>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new(hasher: Arc<dyn PasswordHasher>, codec: Arc<dyn SnapshotCodec>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            hasher,
            codec,
        }
    }

    /// Copy of the account for `username`
    pub fn get_account(&self, username: &str) -> Result<Account> {
        validate::username(username).map_err(Error::InvalidUsername)?;

        let accounts = self.accounts.read();
        let slot = accounts
            .get(username)
            .ok_or_else(|| Error::not_found("account"))?;
        let account = slot.lock().clone();
        Ok(account)
    }

    /// Register a new account, hashing its password
    pub fn add_account(&self, username: &str, password: &str, balance: MicroUsd) -> Result<()> {
        validate::username(username).map_err(Error::InvalidUsername)?;
        validate::password(password).map_err(Error::InvalidPassword)?;

        if self.accounts.read().contains_key(username) {
            return Err(Error::AlreadyExists);
        }

        // Hashing is slow; keep it outside the lock and re-check on insert
        let password_hash = self.hasher.hash(password)?;

        let mut accounts = self.accounts.write();
        match accounts.entry(username.to_string()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Account::new(username, password_hash, balance))));
                tracing::info!(user = username, balance = %balance, "account created");
                Ok(())
            }
        }
    }

    pub fn deposit(&self, username: &str, amount: MicroUsd) -> Result<()> {
        self.with_account(username, |account| {
            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(Error::OutOfBounds)?;
            tracing::info!(user = username, amount = %amount, balance = %account.balance, "deposit");
            Ok(())
        })
    }

    pub fn withdraw(&self, username: &str, amount: MicroUsd) -> Result<()> {
        self.with_account(username, |account| {
            let Some(balance) = account.balance.checked_sub(amount) else {
                tracing::warn!(user = username, amount = %amount, "withdrawal exceeds balance");
                return Err(Error::InsufficientFunds);
            };
            account.balance = balance;
            tracing::info!(user = username, amount = %amount, balance = %balance, "withdrawal");
            Ok(())
        })
    }

    /// Run a read-modify-write on one account under its mutex
    fn with_account<F>(&self, username: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        validate::username(username).map_err(Error::InvalidUsername)?;

        let accounts = self.accounts.read();
        let slot = accounts
            .get(username)
            .ok_or_else(|| Error::not_found("account"))?;
        let mut account = slot.lock();
        f(&mut account)
    }

    /// Fetch the account and check its password
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Account> {
        let account = self.get_account(username)?;
        if !account.verify_password(self.hasher.as_ref(), password) {
            return Err(Error::InvalidCredentials);
        }
        Ok(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.read().contains_key(username)
    }

    /// All usernames, sorted
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.accounts.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Replace the whole ledger with the snapshot at `path`
    ///
    /// Holds a shared ledger lock for the duration of the read. A missing file
    /// is reported as `NotFound`, which a caller at startup should treat as a
    /// first run.
    pub fn load(&self, path: &Path) -> Result<()> {
        let lock = LedgerLock::acquire(path, LockMode::Shared)?;
        self.load_locked(path, &lock)
    }

    /// Like `load`, for a caller that already holds the ledger lock
    pub fn load_locked(&self, path: &Path, lock: &LedgerLock) -> Result<()> {
        lock.check_readable(path)?;
        let mut accounts = self.accounts.write();

        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(format!("snapshot {}", path.display())),
            _ => Error::IoFailure(e),
        })?;

        let snapshot = self.codec.decode(&bytes)?;
        check_snapshot(&snapshot)?;

        let count = snapshot.accounts.len();
        *accounts = snapshot
            .accounts
            .into_iter()
            .map(|(username, account)| (username, Arc::new(Mutex::new(account))))
            .collect();

        tracing::info!(path = %path.display(), accounts = count, codec = self.codec.name(), "ledger loaded");
        Ok(())
    }

    /// Write the whole ledger to `path`, replacing any previous snapshot
    ///
    /// Holds an exclusive ledger lock for the duration of the write. The
    /// snapshot is written to a temporary file next to `path` and renamed into
    /// place, so a crash mid-write leaves the old snapshot intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let lock = LedgerLock::acquire(path, LockMode::Exclusive)?;
        self.save_locked(path, &lock)
    }

    /// Like `save`, for a caller that already holds the ledger lock exclusively
    pub fn save_locked(&self, path: &Path, lock: &LedgerLock) -> Result<()> {
        lock.check_writable(path)?;
        let accounts = self.accounts.write();

        let snapshot = Snapshot::new(
            accounts
                .iter()
                .map(|(username, slot)| (username.clone(), slot.lock().clone()))
                .collect::<BTreeMap<_, _>>(),
        );
        let bytes = self.codec.encode(&snapshot)?;

        write_atomically(path, &bytes).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to save ledger");
            Error::IoFailure(e)
        })?;

        tracing::info!(path = %path.display(), accounts = snapshot.accounts.len(), codec = self.codec.name(), "ledger saved");
        Ok(())
    }
}

/// Move an undecodable snapshot out of the way so the next save can't clobber it
///
/// The file is renamed to `<name>.corrupt-<UTC timestamp>` in the same
/// directory. Requires the ledger lock held exclusively.
pub fn quarantine_snapshot(path: &Path, lock: &LedgerLock) -> Result<PathBuf> {
    lock.check_writable(path)?;

    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
    let backup = path.with_file_name(name);

    fs::rename(path, &backup).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to move corrupt snapshot aside");
        Error::IoFailure(e)
    })?;
    tracing::warn!(path = %path.display(), backup = %backup.display(), "corrupt snapshot moved aside");
    Ok(backup)
}

/// Reject snapshots whose contents break store invariants
fn check_snapshot(snapshot: &Snapshot) -> Result<()> {
    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        tracing::warn!(version = snapshot.format_version, "unsupported snapshot version");
        return Err(Error::CorruptSnapshot);
    }

    for (key, account) in &snapshot.accounts {
        if key != &account.username || validate::username(key).is_err() {
            tracing::warn!("snapshot contains an invalid account key");
            return Err(Error::CorruptSnapshot);
        }
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Argon2Hasher, BincodeCodec, JsonCodec};

    fn test_store() -> AccountStore {
        AccountStore::new(
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            Arc::new(BincodeCodec),
        )
    }

    fn usd(text: &str) -> MicroUsd {
        MicroUsd::parse(text).unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let store = test_store();
        store.add_account("alice", "secret", usd("10.00")).unwrap();

        let account = store.get_account("alice").unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.balance, usd("10.00"));
        assert!(store.contains("alice"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_returns_copy() {
        let store = test_store();
        store.add_account("alice", "secret", usd("10.00")).unwrap();

        let mut copy = store.get_account("alice").unwrap();
        copy.balance = usd("999.00");
        assert_eq!(store.get_account("alice").unwrap().balance, usd("10.00"));
    }

    #[test]
    fn test_get_validates_and_reports_missing() {
        let store = test_store();
        assert!(matches!(store.get_account("Alice"), Err(Error::InvalidUsername(_))));
        assert!(matches!(store.get_account("nobody"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_validates_input() {
        let store = test_store();
        assert!(matches!(
            store.add_account("", "secret", MicroUsd::ZERO),
            Err(Error::InvalidUsername(_))
        ));
        assert!(matches!(
            store.add_account("alice", "Secret!", MicroUsd::ZERO),
            Err(Error::InvalidPassword(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_twice_keeps_first() {
        let store = test_store();
        store.add_account("alice", "first", usd("1.00")).unwrap();
        assert!(matches!(
            store.add_account("alice", "second", usd("2.00")),
            Err(Error::AlreadyExists)
        ));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_account("alice").unwrap().balance, usd("1.00"));
        assert!(store.verify_credentials("alice", "first").is_ok());
        assert!(matches!(
            store.verify_credentials("alice", "second"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let store = test_store();
        store.add_account("alice", "secret", usd("10.00")).unwrap();

        store.deposit("alice", usd("5.25")).unwrap();
        assert_eq!(store.get_account("alice").unwrap().balance, usd("15.25"));

        store.withdraw("alice", usd("15.25")).unwrap();
        assert_eq!(store.get_account("alice").unwrap().balance, MicroUsd::ZERO);
    }

    #[test]
    fn test_withdraw_more_than_balance() {
        let store = test_store();
        store.add_account("alice", "secret", usd("10.00")).unwrap();

        assert!(matches!(
            store.withdraw("alice", usd("10.01")),
            Err(Error::InsufficientFunds)
        ));
        assert_eq!(store.get_account("alice").unwrap().balance, usd("10.00"));
    }

    #[test]
    fn test_mutations_on_missing_account() {
        let store = test_store();
        assert!(matches!(store.deposit("ghost", usd("1.00")), Err(Error::NotFound(_))));
        assert!(matches!(store.withdraw("ghost", usd("1.00")), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_deposit_overflow_leaves_balance() {
        let store = test_store();
        store
            .add_account("whale", "secret", MicroUsd::from_micros(i64::MAX - 10).unwrap())
            .unwrap();

        assert!(matches!(store.deposit("whale", usd("1.00")), Err(Error::OutOfBounds)));
        assert_eq!(
            store.get_account("whale").unwrap().balance.as_micros(),
            i64::MAX - 10
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");

        let store = test_store();
        store.add_account("alice", "secret", usd("10.00")).unwrap();
        store.add_account("bob", "hunter2", usd("0.01")).unwrap();
        store.save(&path).unwrap();

        let fresh = test_store();
        fresh.load(&path).unwrap();
        assert_eq!(fresh.usernames(), vec!["alice", "bob"]);
        for name in ["alice", "bob"] {
            assert_eq!(fresh.get_account(name).unwrap(), store.get_account(name).unwrap());
        }
        assert!(fresh.verify_credentials("bob", "hunter2").is_ok());
    }

    #[test]
    fn test_load_replaces_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");

        let store = test_store();
        store.add_account("alice", "secret", usd("1.00")).unwrap();
        store.save(&path).unwrap();

        let other = test_store();
        other.add_account("zed", "secret", usd("1.00")).unwrap();
        other.load(&path).unwrap();
        assert_eq!(other.usernames(), vec!["alice"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store();
        let err = store.load(&dir.path().join("missing.bin")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_corrupt_file_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");
        fs::write(&path, b"definitely not a snapshot").unwrap();

        let store = test_store();
        store.add_account("alice", "secret", usd("1.00")).unwrap();
        assert!(matches!(store.load(&path), Err(Error::CorruptSnapshot)));
        assert!(store.contains("alice"));
    }

    #[test]
    fn test_load_rejects_mismatched_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let mut accounts = BTreeMap::new();
        accounts.insert("mallory".to_string(), Account::new("alice", "x", MicroUsd::ZERO));
        fs::write(&path, JsonCodec.encode(&Snapshot::new(accounts)).unwrap()).unwrap();

        let store = AccountStore::new(
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
            Arc::new(JsonCodec),
        );
        assert!(matches!(store.load(&path), Err(Error::CorruptSnapshot)));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");

        let mut snapshot = Snapshot::new(BTreeMap::new());
        snapshot.format_version = 99;
        fs::write(&path, BincodeCodec.encode(&snapshot).unwrap()).unwrap();

        assert!(matches!(test_store().load(&path), Err(Error::CorruptSnapshot)));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");

        let store = test_store();
        store.add_account("alice", "secret", usd("1.00")).unwrap();
        store.save(&path).unwrap();
        store.deposit("alice", usd("1.00")).unwrap();
        store.save(&path).unwrap();

        let fresh = test_store();
        fresh.load(&path).unwrap();
        assert_eq!(fresh.get_account("alice").unwrap().balance, usd("2.00"));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("db.bin");
        assert!(matches!(test_store().save(&path), Err(Error::IoFailure(_))));
    }


    #[test]
    fn test_save_locked_needs_exclusive_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");
        let store = test_store();
        store.add_account("alice", "secret", usd("1.00")).unwrap();

        let reader = LedgerLock::acquire(&path, LockMode::Shared).unwrap();
        assert!(matches!(store.save_locked(&path, &reader), Err(Error::LockNotHeld)));
        assert!(!path.exists());
        drop(reader);

        let writer = LedgerLock::acquire(&path, LockMode::Exclusive).unwrap();
        assert!(matches!(
            store.save_locked(&dir.path().join("other.bin"), &writer),
            Err(Error::LockNotHeld)
        ));
        store.save_locked(&path, &writer).unwrap();
        let fresh = test_store();
        fresh.load_locked(&path, &writer).unwrap();
        assert_eq!(fresh.usernames(), vec!["alice"]);
    }

    #[test]
    fn test_quarantine_keeps_corrupt_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.bin");
        fs::write(&path, b"damaged ledger").unwrap();

        let reader = LedgerLock::acquire(&path, LockMode::Shared).unwrap();
        assert!(matches!(quarantine_snapshot(&path, &reader), Err(Error::LockNotHeld)));
        drop(reader);

        let writer = LedgerLock::acquire(&path, LockMode::Exclusive).unwrap();
        let backup = quarantine_snapshot(&path, &writer).unwrap();

        assert!(!path.exists());
        assert_eq!(backup.parent(), path.parent());
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("db.bin.corrupt-"));
        assert_eq!(fs::read(&backup).unwrap(), b"damaged ledger");
    }
}
