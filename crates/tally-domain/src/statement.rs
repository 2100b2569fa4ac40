//! Point-in-time reconciliation statements. Created once, never mutated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub id: Uuid,
    pub account_id: Uuid,
    pub statement_date: NaiveDate,
    /// Balance reported by the external statement.
    pub statement_balance: f64,
    /// Balance computed from cleared ledger entries as of the statement date.
    pub cleared_balance: f64,
    /// `statement_balance - cleared_balance`. A non-zero value is the
    /// expected signal of a discrepancy, not an error.
    pub difference: f64,
    pub created_at: DateTime<Utc>,
}

impl Statement {
    pub fn new(
        account_id: Uuid,
        statement_date: NaiveDate,
        statement_balance: f64,
        cleared_balance: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            statement_date,
            statement_balance,
            cleared_balance,
            difference: statement_balance - cleared_balance,
            created_at,
        }
    }
}

impl Identifiable for Statement {
    fn id(&self) -> Uuid {
        self.id
    }
}
