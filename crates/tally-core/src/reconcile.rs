//! Statement reconciliation: cleared balance as of a date, recorded variance.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use tally_domain::{Statement, UserId};

use crate::error::EngineError;
use crate::spending;
use crate::store::{LedgerStore, WriteBatch, WriteOp};
use crate::time::Clock;

pub struct ReconcileService;

impl ReconcileService {
    /// Computes the cleared balance as of `statement_date` and records the
    /// variance against the supplied statement balance.
    ///
    /// Pure over cleared entries and the starting balance; no transaction is
    /// mutated. A non-zero difference is the expected output of a
    /// discrepancy, left for the caller to resolve.
    pub fn reconcile(
        store: &mut dyn LedgerStore,
        owner: UserId,
        account_id: Uuid,
        statement_date: NaiveDate,
        statement_balance: f64,
        clock: &dyn Clock,
    ) -> Result<Statement, EngineError> {
        let account = store
            .account(account_id)?
            .filter(|account| account.owner == owner)
            .ok_or(EngineError::AccountNotFound(account_id))?;

        let cleared_balance = spending::cleared_balance(store, &account, statement_date)?;
        let statement = Statement::new(
            account.id,
            statement_date,
            statement_balance,
            cleared_balance,
            clock.now(),
        );
        store.commit(WriteBatch::new().with(WriteOp::InsertStatement(statement.clone())))?;

        info!(
            account_id = %account.id,
            %statement_date,
            difference = statement.difference,
            "statement reconciled"
        );
        Ok(statement)
    }

    /// Past statements for an owned account, newest statement date first.
    pub fn statements(
        store: &dyn LedgerStore,
        owner: UserId,
        account_id: Uuid,
    ) -> Result<Vec<Statement>, EngineError> {
        store
            .account(account_id)?
            .filter(|account| account.owner == owner)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        Ok(store.statements(account_id)?)
    }
}
