//! Budget threshold evaluation and the unread-alert feed.

use tracing::info;
use uuid::Uuid;

use tally_domain::{Budget, BudgetAlert, UserId};

use crate::error::EngineError;
use crate::spending;
use crate::store::{LedgerStore, WriteBatch, WriteOp};
use crate::time::Clock;

pub const DEFAULT_ALERT_LIMIT: usize = 10;
pub const MAX_ALERT_LIMIT: usize = 50;

#[derive(Debug, Clone, Default)]
/// Alerts for one user plus the outstanding unread count, for the
/// notification sink to render.
pub struct AlertFeed {
    pub alerts: Vec<BudgetAlert>,
    pub unread_count: usize,
}

pub struct AlertService;

impl AlertService {
    /// Creates one alert per newly crossed threshold, idempotently.
    ///
    /// Re-running is always safe: the (budget, period, threshold) uniqueness
    /// constraint means a crossing is recorded once, even if spend drops and
    /// rises again within the period. Returns only newly created alerts.
    pub fn evaluate(
        store: &mut dyn LedgerStore,
        budget: &Budget,
        user: Option<UserId>,
        clock: &dyn Clock,
    ) -> Result<Vec<BudgetAlert>, EngineError> {
        if budget.amount <= 0.0 {
            return Ok(Vec::new());
        }

        let total_spent = spending::spent_in_period(store, budget.category_id, budget.period)?;
        let percent_used = total_spent / budget.amount * 100.0;

        let mut created = Vec::new();
        for &threshold in budget.thresholds.values() {
            if percent_used < f64::from(threshold) {
                continue;
            }
            if store.alert_exists(budget.id, budget.period, threshold)? {
                continue;
            }
            let alert = BudgetAlert::new(
                budget,
                threshold,
                percent_used,
                total_spent,
                clock.now(),
                user,
            );
            store.commit(WriteBatch::new().with(WriteOp::InsertAlert(alert.clone())))?;
            info!(
                budget_id = %budget.id,
                period = %budget.period,
                threshold,
                percent_used = alert.percent_used,
                "budget threshold crossed"
            );
            created.push(alert);
        }
        Ok(created)
    }

    /// Newest-first alert feed for one user. `limit` is clamped to
    /// 1..=[`MAX_ALERT_LIMIT`].
    pub fn feed(
        store: &dyn LedgerStore,
        user: UserId,
        unread_only: bool,
        limit: usize,
    ) -> Result<AlertFeed, EngineError> {
        let limit = limit.clamp(1, MAX_ALERT_LIMIT);
        let alerts = store.alerts_for_user(user, unread_only, limit)?;
        let unread_count = store.unread_alert_count(user)?;
        Ok(AlertFeed {
            alerts,
            unread_count,
        })
    }

    pub fn mark_read(
        store: &mut dyn LedgerStore,
        user: UserId,
        alert_id: Uuid,
    ) -> Result<(), EngineError> {
        let alert = store
            .alert(alert_id)?
            .filter(|a| a.user_id == Some(user))
            .ok_or(EngineError::AlertNotFound(alert_id))?;
        if alert.is_read {
            return Ok(());
        }
        store.commit(WriteBatch::new().with(WriteOp::MarkAlertRead(alert_id)))?;
        Ok(())
    }

    pub fn mark_all_read(store: &mut dyn LedgerStore, user: UserId) -> Result<(), EngineError> {
        store.commit(WriteBatch::new().with(WriteOp::MarkAllAlertsRead(user)))?;
        Ok(())
    }
}
