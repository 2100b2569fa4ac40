//! Recurring posting: advances every due rule to "caught up", posting one
//! ledger entry per elapsed due date, exactly once.

use chrono::NaiveDate;
use tracing::{debug, error, warn};
use uuid::Uuid;

use tally_domain::{BudgetAlert, PostEvent, RecurringRule, Transaction, TransactionKind};

use crate::alerts::AlertService;
use crate::error::EngineError;
use crate::store::{LedgerStore, WriteBatch, WriteOp};
use crate::time::Clock;

/// Safety cap per rule per run; a misconfigured due date far in the past must
/// not loop unbounded.
pub const MAX_CATCHUP_POSTINGS: usize = 1024;

#[derive(Debug, Clone)]
/// One concrete posting produced by a scheduler run.
pub struct PostedOccurrence {
    pub rule_id: Uuid,
    pub transaction_id: Uuid,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct AdvanceOutcome {
    pub posted: Vec<PostedOccurrence>,
    /// Alerts created by budget evaluation triggered from expense postings.
    pub alerts: Vec<BudgetAlert>,
}

pub struct PostingService;

impl PostingService {
    /// Catches up every active rule due on or before `as_of`.
    ///
    /// Rules are independent units of work: a rule whose commit fails is
    /// logged and left for the next tick, the rest still run. Calling this
    /// twice with the same `as_of` posts nothing the second time.
    pub fn advance(
        store: &mut dyn LedgerStore,
        as_of: NaiveDate,
        clock: &dyn Clock,
    ) -> Result<AdvanceOutcome, EngineError> {
        let mut outcome = AdvanceOutcome::default();
        for rule in store.due_rules(as_of)? {
            let rule_id = rule.id;
            if let Err(err) = Self::catch_up_rule(store, rule, as_of, clock, &mut outcome) {
                match err {
                    EngineError::Consistency(ref reason) => {
                        error!(%rule_id, reason, "aborting rule after consistency violation");
                    }
                    ref other => {
                        warn!(%rule_id, error = %other, "rule catch-up failed, will retry next tick");
                    }
                }
            }
        }
        Ok(outcome)
    }

    /// Rejects rule definitions the scheduler is not prepared to run.
    pub fn validate_rule(rule: &RecurringRule) -> Result<(), EngineError> {
        if rule.title.trim().is_empty() {
            return Err(EngineError::Validation("Title is required".into()));
        }
        if rule.amount <= 0.0 {
            return Err(EngineError::Validation(
                "Amount must be a positive number".into(),
            ));
        }
        if let Some(remaining) = rule.remaining_occurrences {
            if remaining < 1 {
                return Err(EngineError::Validation(
                    "remaining_occurrences must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }

    fn catch_up_rule(
        store: &mut dyn LedgerStore,
        mut rule: RecurringRule,
        as_of: NaiveDate,
        clock: &dyn Clock,
        outcome: &mut AdvanceOutcome,
    ) -> Result<(), EngineError> {
        let mut iterations = 0usize;
        while rule.is_due(as_of) {
            iterations += 1;
            if iterations > MAX_CATCHUP_POSTINGS {
                warn!(rule_id = %rule.id, cap = MAX_CATCHUP_POSTINGS, "catch-up cap reached, deferring remainder");
                break;
            }

            if rule.past_end() {
                rule.deactivate();
                store.commit(WriteBatch::new().with(WriteOp::UpdateRule(rule.clone())))?;
                break;
            }
            if rule.remaining_occurrences == Some(0) {
                rule.deactivate();
                store.commit(WriteBatch::new().with(WriteOp::UpdateRule(rule.clone())))?;
                break;
            }

            let due = rule.next_due_date;
            if store.post_event_exists(rule.id, due)? {
                return Err(EngineError::Consistency(format!(
                    "post event already exists for rule {} on {due}",
                    rule.id
                )));
            }

            let txn = Transaction::from_rule(&rule, due);
            let event = PostEvent::new(rule.id, txn.id, due, clock.now());

            if let Some(remaining) = rule.remaining_occurrences.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    rule.active = false;
                }
            }
            rule.advance_schedule();

            // One atomic state transition: the posting, its audit event, and
            // the advanced schedule commit together or not at all.
            let batch = WriteBatch::new()
                .with(WriteOp::InsertTransaction(txn.clone()))
                .with(WriteOp::InsertPostEvent(event))
                .with(WriteOp::UpdateRule(rule.clone()));
            store.commit(batch)?;

            debug!(rule_id = %rule.id, %due, next_due = %rule.next_due_date, "posted recurring occurrence");
            outcome.posted.push(PostedOccurrence {
                rule_id: rule.id,
                transaction_id: txn.id,
                due_date: due,
            });

            Self::trigger_budget_evaluation(store, &txn, clock, outcome)?;
        }
        Ok(())
    }

    /// An expense posting in a budgeted category re-evaluates that budget.
    fn trigger_budget_evaluation(
        store: &mut dyn LedgerStore,
        txn: &Transaction,
        clock: &dyn Clock,
        outcome: &mut AdvanceOutcome,
    ) -> Result<(), EngineError> {
        if txn.kind != TransactionKind::Expense || txn.is_transfer {
            return Ok(());
        }
        let Some(category_id) = txn.category_id else {
            return Ok(());
        };
        let period = tally_domain::PeriodKey::from_date(txn.date);
        for budget in store.budgets_for_category(category_id, period)? {
            let created = AlertService::evaluate(store, &budget, None, clock)?;
            outcome.alerts.extend(created);
        }
        Ok(())
    }
}
