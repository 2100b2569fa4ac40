//! tally-domain
//!
//! Persisted data model for the Tally finance tracker. Pure rows plus calendar
//! arithmetic; no services, no I/O.

pub mod account;
pub mod book;
pub mod budget;
pub mod common;
pub mod recurring;
pub mod statement;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use book::LedgerBook;
pub use budget::{Budget, BudgetAlert, ThresholdSet, DEFAULT_THRESHOLDS};
pub use common::{Frequency, Identifiable, PeriodKey, UserId};
pub use recurring::{PostEvent, RecurringRule};
pub use statement::Statement;
pub use transaction::{Transaction, TransactionKind};
