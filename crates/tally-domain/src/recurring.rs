//! Recurring rules and the append-only post events that anchor idempotency.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Frequency, Identifiable};
use crate::transaction::TransactionKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Template that generates ledger entries on a schedule until ended or exhausted.
pub struct RecurringRule {
    pub id: Uuid,
    pub title: String,
    pub amount: f64,
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    pub frequency: Frequency,
    pub next_due_date: NaiveDate,
    /// Day-of-month the schedule was created on. Month-based advancement
    /// clamps to shorter months but returns to this day afterwards.
    /// Zero (older rows) falls back to the current due date's day.
    #[serde(default)]
    pub day_anchor: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_occurrences: Option<u32>,
    pub active: bool,
}

impl RecurringRule {
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        kind: TransactionKind,
        frequency: Frequency,
        next_due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            amount,
            kind,
            category_id: None,
            account_id: None,
            frequency,
            next_due_date,
            day_anchor: next_due_date.day(),
            end_date: None,
            remaining_occurrences: None,
            active: true,
        }
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn ending_on(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn limited_to(mut self, occurrences: u32) -> Self {
        self.remaining_occurrences = Some(occurrences);
        self
    }

    pub fn anchor_day(&self) -> u32 {
        if self.day_anchor == 0 {
            self.next_due_date.day()
        } else {
            self.day_anchor
        }
    }

    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.active && self.next_due_date <= as_of
    }

    /// True once the current due date has passed the configured end.
    pub fn past_end(&self) -> bool {
        self.end_date
            .map(|end| self.next_due_date > end)
            .unwrap_or(false)
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Moves the schedule to the next due date, deactivating when the new
    /// date exceeds the configured end.
    pub fn advance_schedule(&mut self) {
        let anchor = self.anchor_day();
        self.next_due_date = self.frequency.advance(self.next_due_date, anchor);
        if self.past_end() {
            self.active = false;
        }
    }
}

impl Identifiable for RecurringRule {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Append-only audit row linking one rule posting to the transaction it
/// created. At most one event exists per (rule, due date).
pub struct PostEvent {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub transaction_id: Uuid,
    pub due_date: NaiveDate,
    pub posted_at: DateTime<Utc>,
}

impl PostEvent {
    pub fn new(
        rule_id: Uuid,
        transaction_id: Uuid,
        due_date: NaiveDate,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id,
            transaction_id,
            due_date,
            posted_at,
        }
    }
}

impl Identifiable for PostEvent {
    fn id(&self) -> Uuid {
        self.id
    }
}
