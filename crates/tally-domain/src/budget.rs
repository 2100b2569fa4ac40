//! Budgets and their deduplicated threshold-crossing alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identifiable, PeriodKey, UserId};

/// Thresholds applied when a budget does not configure any valid ones.
pub const DEFAULT_THRESHOLDS: [u8; 4] = [50, 75, 90, 100];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
/// Ordered set of unique alert thresholds, each in 1..=100.
///
/// Any input that yields no valid value collapses to [`DEFAULT_THRESHOLDS`],
/// so a budget always has at least one threshold to cross.
pub struct ThresholdSet(Vec<u8>);

impl ThresholdSet {
    /// Parses a user-editable comma-separated list such as `"50, 75,90"`.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .filter_map(|item| item.trim().parse::<i64>().ok())
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }

    pub fn values(&self) -> &[u8] {
        &self.0
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS.to_vec())
    }
}

impl FromIterator<i64> for ThresholdSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut values: Vec<u8> = iter
            .into_iter()
            .filter(|n| (1..=100).contains(n))
            .map(|n| n as u8)
            .collect();
        values.sort_unstable();
        values.dedup();
        if values.is_empty() {
            Self::default()
        } else {
            Self(values)
        }
    }
}

impl From<Vec<u8>> for ThresholdSet {
    fn from(values: Vec<u8>) -> Self {
        values.into_iter().map(i64::from).collect()
    }
}

impl From<ThresholdSet> for Vec<u8> {
    fn from(set: ThresholdSet) -> Self {
        set.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Spending cap for one category in one year-month period.
pub struct Budget {
    pub id: Uuid,
    pub category_id: Uuid,
    pub period: PeriodKey,
    pub amount: f64,
    #[serde(default)]
    pub thresholds: ThresholdSet,
}

impl Budget {
    pub fn new(category_id: Uuid, period: PeriodKey, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            period,
            amount,
            thresholds: ThresholdSet::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdSet) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Identifiable for Budget {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One threshold crossing, unique per (budget, period, threshold).
///
/// Snapshots percent-used and total-spent at creation time; the crossing is
/// detected once and never re-emitted within the period.
pub struct BudgetAlert {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub period: PeriodKey,
    pub threshold: u8,
    pub percent_used: f64,
    pub total_spent: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl BudgetAlert {
    pub fn new(
        budget: &Budget,
        threshold: u8,
        percent_used: f64,
        total_spent: f64,
        created_at: DateTime<Utc>,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget_id: budget.id,
            category_id: budget.category_id,
            period: budget.period,
            threshold,
            percent_used: round2(percent_used),
            total_spent: round2(total_spent),
            created_at,
            is_read: false,
            user_id,
        }
    }
}

impl Identifiable for BudgetAlert {
    fn id(&self) -> Uuid {
        self.id
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
