//! Persistence boundary: reads plus an atomic multi-row commit.
//!
//! The engine assumes "commit succeeds or nothing happened" semantics; a
//! partially applied batch must never be observable.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use tally_domain::{
    Account, Budget, BudgetAlert, PeriodKey, PostEvent, RecurringRule, Statement, Transaction,
    TransactionKind, UserId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate post event for rule {rule_id} on {due_date}")]
    DuplicatePostEvent { rule_id: Uuid, due_date: NaiveDate },
    #[error("duplicate alert for budget {budget_id} period {period} threshold {threshold}")]
    DuplicateAlert {
        budget_id: Uuid,
        period: PeriodKey,
        threshold: u8,
    },
    #[error("transfer group {0} would not have exactly two balanced legs")]
    UnbalancedTransfer(Uuid),
    #[error("{entity} {id} not found")]
    MissingRow { entity: &'static str, id: Uuid },
}

#[derive(Debug, Clone, Default)]
/// Filter for ledger-entry range queries. Unset fields match everything.
pub struct TransactionFilter {
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub cleared: Option<bool>,
    /// `Some(true)` keeps only transfer legs, `Some(false)` excludes them.
    pub transfers: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn cleared(mut self, cleared: bool) -> Self {
        self.cleared = Some(cleared);
        self
    }

    pub fn transfers_only(mut self) -> Self {
        self.transfers = Some(true);
        self
    }

    pub fn exclude_transfers(mut self) -> Self {
        self.transfers = Some(false);
        self
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn through(mut self, to: NaiveDate) -> Self {
        self.date_to = Some(to);
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if let Some(account_id) = self.account_id {
            if txn.account_id != Some(account_id) {
                return false;
            }
        }
        if let Some(category_id) = self.category_id {
            if txn.category_id != Some(category_id) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if txn.kind != kind {
                return false;
            }
        }
        if let Some(cleared) = self.cleared {
            if txn.is_cleared != cleared {
                return false;
            }
        }
        if let Some(transfers) = self.transfers {
            if txn.is_transfer != transfers {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if txn.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if txn.date > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
/// One row mutation inside an atomic batch.
pub enum WriteOp {
    InsertTransaction(Transaction),
    InsertPostEvent(PostEvent),
    UpdateRule(RecurringRule),
    InsertAlert(BudgetAlert),
    InsertStatement(Statement),
    MarkAlertRead(Uuid),
    MarkAllAlertsRead(UserId),
}

#[derive(Debug, Clone, Default)]
/// Ordered set of mutations committed together or not at all.
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn with(mut self, op: WriteOp) -> Self {
        self.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}

/// Durable record store for the engine. Implementations own all persisted
/// rows; the engine holds no state between invocations.
pub trait LedgerStore {
    fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    fn accounts(&self) -> Result<Vec<Account>, StoreError>;

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;

    /// Active rules with `next_due_date <= as_of`, oldest due first.
    fn due_rules(&self, as_of: NaiveDate) -> Result<Vec<RecurringRule>, StoreError>;

    fn rule(&self, id: Uuid) -> Result<Option<RecurringRule>, StoreError>;

    fn post_event_exists(&self, rule_id: Uuid, due_date: NaiveDate) -> Result<bool, StoreError>;

    /// Most recent post events first.
    fn recent_post_events(&self, limit: usize) -> Result<Vec<PostEvent>, StoreError>;

    fn budget(&self, id: Uuid) -> Result<Option<Budget>, StoreError>;

    fn budgets_for_category(
        &self,
        category_id: Uuid,
        period: PeriodKey,
    ) -> Result<Vec<Budget>, StoreError>;

    fn alert_exists(
        &self,
        budget_id: Uuid,
        period: PeriodKey,
        threshold: u8,
    ) -> Result<bool, StoreError>;

    fn alert(&self, id: Uuid) -> Result<Option<BudgetAlert>, StoreError>;

    /// Alerts for one user, newest first.
    fn alerts_for_user(
        &self,
        user: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<BudgetAlert>, StoreError>;

    fn unread_alert_count(&self, user: UserId) -> Result<usize, StoreError>;

    /// Statements for an account, newest statement date first.
    fn statements(&self, account_id: Uuid) -> Result<Vec<Statement>, StoreError>;

    /// Applies every op or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;
}
