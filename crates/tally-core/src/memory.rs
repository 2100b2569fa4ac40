//! Reference in-memory [`LedgerStore`] over a [`LedgerBook`].
//!
//! Commits stage the whole batch against a copy of the book and swap it in
//! only when every op and constraint check passes, so a failed batch leaves
//! no trace. Uniqueness constraints live here, not in call order.

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use tally_domain::{
    Account, Budget, BudgetAlert, LedgerBook, PeriodKey, PostEvent, RecurringRule, Statement,
    Transaction, UserId,
};

use crate::store::{LedgerStore, StoreError, TransactionFilter, WriteBatch, WriteOp};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    book: LedgerBook,
}

impl MemoryStore {
    pub fn new(book: LedgerBook) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &LedgerBook {
        &self.book
    }

    pub fn into_book(self) -> LedgerBook {
        self.book
    }

    fn apply(book: &mut LedgerBook, op: WriteOp, touched_groups: &mut HashSet<Uuid>) -> Result<(), StoreError> {
        match op {
            WriteOp::InsertTransaction(txn) => {
                if let Some(group) = txn.transfer_group {
                    touched_groups.insert(group);
                }
                book.transactions.push(txn);
            }
            WriteOp::InsertPostEvent(event) => {
                if book.post_event_for(event.rule_id, event.due_date).is_some() {
                    return Err(StoreError::DuplicatePostEvent {
                        rule_id: event.rule_id,
                        due_date: event.due_date,
                    });
                }
                book.post_events.push(event);
            }
            WriteOp::UpdateRule(rule) => {
                let existing = book.rule_mut(rule.id).ok_or(StoreError::MissingRow {
                    entity: "rule",
                    id: rule.id,
                })?;
                *existing = rule;
            }
            WriteOp::InsertAlert(alert) => {
                if book
                    .alert_for(alert.budget_id, alert.period, alert.threshold)
                    .is_some()
                {
                    return Err(StoreError::DuplicateAlert {
                        budget_id: alert.budget_id,
                        period: alert.period,
                        threshold: alert.threshold,
                    });
                }
                book.alerts.push(alert);
            }
            WriteOp::InsertStatement(statement) => {
                book.statements.push(statement);
            }
            WriteOp::MarkAlertRead(id) => {
                let alert = book.alert_mut(id).ok_or(StoreError::MissingRow {
                    entity: "alert",
                    id,
                })?;
                alert.is_read = true;
            }
            WriteOp::MarkAllAlertsRead(user) => {
                for alert in &mut book.alerts {
                    if alert.user_id == Some(user) {
                        alert.is_read = true;
                    }
                }
            }
        }
        Ok(())
    }

    fn verify_transfer_groups(
        book: &LedgerBook,
        touched_groups: &HashSet<Uuid>,
    ) -> Result<(), StoreError> {
        for &group in touched_groups {
            let legs = book.transfer_legs(group);
            if legs.len() != 2 {
                return Err(StoreError::UnbalancedTransfer(group));
            }
            let balanced = legs[0].kind != legs[1].kind
                && legs[0].amount == legs[1].amount
                && legs.iter().all(|leg| leg.is_transfer);
            if !balanced {
                return Err(StoreError::UnbalancedTransfer(group));
            }
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.book.account(id).cloned())
    }

    fn accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.book.accounts.clone())
    }

    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .book
            .transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .cloned()
            .collect())
    }

    fn due_rules(&self, as_of: NaiveDate) -> Result<Vec<RecurringRule>, StoreError> {
        let mut due: Vec<RecurringRule> = self
            .book
            .rules
            .iter()
            .filter(|rule| rule.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by_key(|rule| rule.next_due_date);
        Ok(due)
    }

    fn rule(&self, id: Uuid) -> Result<Option<RecurringRule>, StoreError> {
        Ok(self.book.rule(id).cloned())
    }

    fn post_event_exists(&self, rule_id: Uuid, due_date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self.book.post_event_for(rule_id, due_date).is_some())
    }

    fn recent_post_events(&self, limit: usize) -> Result<Vec<PostEvent>, StoreError> {
        let mut events = self.book.post_events.clone();
        events.sort_by_key(|e| std::cmp::Reverse(e.posted_at));
        events.truncate(limit);
        Ok(events)
    }

    fn budget(&self, id: Uuid) -> Result<Option<Budget>, StoreError> {
        Ok(self.book.budget(id).cloned())
    }

    fn budgets_for_category(
        &self,
        category_id: Uuid,
        period: PeriodKey,
    ) -> Result<Vec<Budget>, StoreError> {
        Ok(self
            .book
            .budgets
            .iter()
            .filter(|b| b.category_id == category_id && b.period == period)
            .cloned()
            .collect())
    }

    fn alert_exists(
        &self,
        budget_id: Uuid,
        period: PeriodKey,
        threshold: u8,
    ) -> Result<bool, StoreError> {
        Ok(self.book.alert_for(budget_id, period, threshold).is_some())
    }

    fn alert(&self, id: Uuid) -> Result<Option<BudgetAlert>, StoreError> {
        Ok(self.book.alerts.iter().find(|a| a.id == id).cloned())
    }

    fn alerts_for_user(
        &self,
        user: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<BudgetAlert>, StoreError> {
        let mut alerts: Vec<BudgetAlert> = self
            .book
            .alerts
            .iter()
            .filter(|a| a.user_id == Some(user) && (!unread_only || !a.is_read))
            .cloned()
            .collect();
        alerts.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        alerts.truncate(limit);
        Ok(alerts)
    }

    fn unread_alert_count(&self, user: UserId) -> Result<usize, StoreError> {
        Ok(self
            .book
            .alerts
            .iter()
            .filter(|a| a.user_id == Some(user) && !a.is_read)
            .count())
    }

    fn statements(&self, account_id: Uuid) -> Result<Vec<Statement>, StoreError> {
        let mut statements: Vec<Statement> = self
            .book
            .statements
            .iter()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        statements.sort_by_key(|s| std::cmp::Reverse((s.statement_date, s.created_at)));
        Ok(statements)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut staged = self.book.clone();
        let mut touched_groups = HashSet::new();
        for op in batch.ops {
            Self::apply(&mut staged, op, &mut touched_groups)?;
        }
        Self::verify_transfer_groups(&staged, &touched_groups)?;
        self.book = staged;
        Ok(())
    }
}
