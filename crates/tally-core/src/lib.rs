//! tally-core
//!
//! The ledger consistency engine: recurring posting, budget alerts, transfers,
//! and reconciliation. Depends on tally-domain. No CLI, no terminal I/O; the
//! only persistence contact is the [`store::LedgerStore`] boundary.

pub mod alerts;
pub mod error;
pub mod memory;
pub mod reconcile;
pub mod scheduler;
pub mod spending;
pub mod store;
pub mod time;
pub mod transfer;

pub use alerts::{AlertFeed, AlertService};
pub use error::EngineError;
pub use memory::MemoryStore;
pub use reconcile::ReconcileService;
pub use scheduler::{AdvanceOutcome, PostedOccurrence, PostingService, MAX_CATCHUP_POSTINGS};
pub use store::{LedgerStore, StoreError, TransactionFilter, WriteBatch, WriteOp};
pub use time::Clock;
pub use transfer::{TransferRecord, TransferRequest, TransferResult, TransferService};

#[cfg(test)]
mod tests;
