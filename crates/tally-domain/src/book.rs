//! The full persisted row set, serialized as one document by the storage layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::Account;
use crate::budget::{Budget, BudgetAlert};
use crate::common::PeriodKey;
use crate::recurring::{PostEvent, RecurringRule};
use crate::statement::Statement;
use crate::transaction::Transaction;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerBook {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub rules: Vec<RecurringRule>,
    #[serde(default)]
    pub post_events: Vec<PostEvent>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub alerts: Vec<BudgetAlert>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn rule(&self, id: Uuid) -> Option<&RecurringRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_mut(&mut self, id: Uuid) -> Option<&mut RecurringRule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    pub fn budget(&self, id: Uuid) -> Option<&Budget> {
        self.budgets.iter().find(|b| b.id == id)
    }

    pub fn alert_mut(&mut self, id: Uuid) -> Option<&mut BudgetAlert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }

    pub fn post_event_for(&self, rule_id: Uuid, due_date: NaiveDate) -> Option<&PostEvent> {
        self.post_events
            .iter()
            .find(|e| e.rule_id == rule_id && e.due_date == due_date)
    }

    pub fn alert_for(&self, budget_id: Uuid, period: PeriodKey, threshold: u8) -> Option<&BudgetAlert> {
        self.alerts.iter().find(|a| {
            a.budget_id == budget_id && a.period == period && a.threshold == threshold
        })
    }

    /// Ledger entries sharing a transfer key. A consistent book yields
    /// exactly two, one per direction.
    pub fn transfer_legs(&self, transfer_group: Uuid) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.transfer_group == Some(transfer_group))
            .collect()
    }
}
