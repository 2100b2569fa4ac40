//! The single source of truth for spend and balance arithmetic.
//!
//! Budget evaluation and every other spend summary go through
//! [`spent_in_period`]; transfer legs are always excluded.

use chrono::NaiveDate;
use uuid::Uuid;

use tally_domain::{Account, PeriodKey, TransactionKind};

use crate::store::{LedgerStore, StoreError, TransactionFilter};

/// Total Expense spend for a category within one year-month period.
pub fn spent_in_period(
    store: &dyn LedgerStore,
    category_id: Uuid,
    period: PeriodKey,
) -> Result<f64, StoreError> {
    let filter = TransactionFilter::new()
        .category(category_id)
        .kind(TransactionKind::Expense)
        .exclude_transfers()
        .between(period.first_day(), period.last_day());
    sum_amounts(store, &filter)
}

/// Derived balance: starting balance plus all Income minus all Expense.
pub fn account_balance(store: &dyn LedgerStore, account: &Account) -> Result<f64, StoreError> {
    let income = sum_amounts(
        store,
        &TransactionFilter::new()
            .account(account.id)
            .kind(TransactionKind::Income),
    )?;
    let expense = sum_amounts(
        store,
        &TransactionFilter::new()
            .account(account.id)
            .kind(TransactionKind::Expense),
    )?;
    Ok(account.starting_balance + income - expense)
}

/// Balance of cleared entries dated on or before `as_of`.
pub fn cleared_balance(
    store: &dyn LedgerStore,
    account: &Account,
    as_of: NaiveDate,
) -> Result<f64, StoreError> {
    let income = sum_amounts(
        store,
        &TransactionFilter::new()
            .account(account.id)
            .kind(TransactionKind::Income)
            .cleared(true)
            .through(as_of),
    )?;
    let expense = sum_amounts(
        store,
        &TransactionFilter::new()
            .account(account.id)
            .kind(TransactionKind::Expense)
            .cleared(true)
            .through(as_of),
    )?;
    Ok(account.starting_balance + income - expense)
}

fn sum_amounts(store: &dyn LedgerStore, filter: &TransactionFilter) -> Result<f64, StoreError> {
    Ok(store
        .transactions(filter)?
        .iter()
        .map(|txn| txn.amount)
        .sum())
}
