//! Service layer - business logic orchestration
//!
//! `AccountStore` owns the ledger; `BankService` composes it with a session
//! manager into the user-facing flows. `LedgerLock` serializes processes
//! sharing one snapshot.

mod bank;
mod ledger_lock;
mod store;

pub use bank::{BankService, TransactionKind};
pub use ledger_lock::{LedgerLock, LockMode};
pub use store::{quarantine_snapshot, AccountStore};
