//! Ledger entries: dated, directional amounts against an account.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;
use crate::recurring::RecurringRule;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<Uuid>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_group: Option<Uuid>,
    #[serde(default)]
    pub is_transfer: bool,
    #[serde(default)]
    pub is_cleared: bool,
}

impl Transaction {
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            amount,
            kind,
            date,
            account_id: None,
            category_id: None,
            rule_id: None,
            is_recurring: false,
            transfer_group: None,
            is_transfer: false,
            is_cleared: false,
        }
    }

    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn cleared(mut self) -> Self {
        self.is_cleared = true;
        self
    }

    /// Builds the concrete ledger entry for one due occurrence of a rule.
    pub fn from_rule(rule: &RecurringRule, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: rule.title.clone(),
            amount: rule.amount,
            kind: rule.kind,
            date: due_date,
            account_id: rule.account_id,
            category_id: rule.category_id,
            rule_id: Some(rule.id),
            is_recurring: true,
            transfer_group: None,
            is_transfer: false,
            is_cleared: false,
        }
    }

    /// Builds one leg of a two-leg transfer. Legs are cleared immediately
    /// since both sides are internal.
    pub fn transfer_leg(
        title: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
        date: NaiveDate,
        account_id: Uuid,
        transfer_group: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            amount,
            kind,
            date,
            account_id: Some(account_id),
            category_id: None,
            rule_id: None,
            is_recurring: false,
            transfer_group: Some(transfer_group),
            is_transfer: true,
            is_cleared: true,
        }
    }

    /// Signed contribution of this entry to its account balance.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Direction of a ledger entry.
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        };
        f.write_str(label)
    }
}
