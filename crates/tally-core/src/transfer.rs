//! Balanced two-leg transfers between accounts owned by the same user.

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use tally_domain::{Account, Transaction, TransactionKind, UserId};

use crate::error::EngineError;
use crate::store::{LedgerStore, TransactionFilter, WriteBatch, WriteOp};

pub const DEFAULT_TRANSFER_LIMIT: usize = 20;
pub const MAX_TRANSFER_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub amount: f64,
    pub date: NaiveDate,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct TransferResult {
    pub transfer_group: Uuid,
    pub outgoing: Transaction,
    pub incoming: Transaction,
}

#[derive(Debug, Clone)]
/// One past transfer, both legs resolved.
pub struct TransferRecord {
    pub transfer_group: Uuid,
    pub date: NaiveDate,
    pub amount: f64,
    pub from_account: Uuid,
    pub to_account: Uuid,
}

pub struct TransferService;

impl TransferService {
    /// Creates the two legs of a transfer as one atomic unit.
    ///
    /// The Expense leg debits `from_account`, the Income leg credits
    /// `to_account`; both carry the same fresh transfer key and are cleared
    /// immediately. A transfer is never visible as a single leg.
    pub fn create(
        store: &mut dyn LedgerStore,
        owner: UserId,
        request: TransferRequest,
    ) -> Result<TransferResult, EngineError> {
        if request.from_account == request.to_account {
            return Err(EngineError::Validation(
                "from and to accounts must differ".into(),
            ));
        }
        if request.amount <= 0.0 {
            return Err(EngineError::Validation("Amount must be positive".into()));
        }
        Self::owned_account(store, owner, request.from_account)?;
        Self::owned_account(store, owner, request.to_account)?;

        let title = if request.title.trim().is_empty() {
            "Transfer".to_string()
        } else {
            request.title.trim().to_string()
        };

        let transfer_group = Uuid::new_v4();
        let outgoing = Transaction::transfer_leg(
            title.clone(),
            request.amount,
            TransactionKind::Expense,
            request.date,
            request.from_account,
            transfer_group,
        );
        let incoming = Transaction::transfer_leg(
            title,
            request.amount,
            TransactionKind::Income,
            request.date,
            request.to_account,
            transfer_group,
        );

        store.commit(
            WriteBatch::new()
                .with(WriteOp::InsertTransaction(outgoing.clone()))
                .with(WriteOp::InsertTransaction(incoming.clone())),
        )?;

        info!(
            %transfer_group,
            from = %request.from_account,
            to = %request.to_account,
            amount = request.amount,
            "transfer created"
        );
        Ok(TransferResult {
            transfer_group,
            outgoing,
            incoming,
        })
    }

    /// Past transfers touching the user's accounts, newest first. Groups
    /// missing either leg are skipped rather than surfaced half-formed.
    pub fn list(
        store: &dyn LedgerStore,
        owner: UserId,
        limit: usize,
    ) -> Result<Vec<TransferRecord>, EngineError> {
        let limit = limit.clamp(1, MAX_TRANSFER_LIMIT);
        let owned: Vec<Uuid> = store
            .accounts()?
            .into_iter()
            .filter(|a| a.owner == owner)
            .map(|a| a.id)
            .collect();

        let legs = store.transactions(&TransactionFilter::new().transfers_only())?;
        let mut records = Vec::new();
        let mut seen = Vec::new();
        let mut sorted = legs.clone();
        sorted.sort_by_key(|t| std::cmp::Reverse(t.date));

        for leg in &sorted {
            let Some(group) = leg.transfer_group else {
                continue;
            };
            if seen.contains(&group) {
                continue;
            }
            seen.push(group);

            let pair: Vec<&Transaction> =
                legs.iter().filter(|t| t.transfer_group == Some(group)).collect();
            let outgoing = pair.iter().find(|t| t.kind == TransactionKind::Expense);
            let incoming = pair.iter().find(|t| t.kind == TransactionKind::Income);
            let (Some(outgoing), Some(incoming)) = (outgoing, incoming) else {
                continue;
            };
            let touches_owner = [outgoing.account_id, incoming.account_id]
                .iter()
                .flatten()
                .any(|id| owned.contains(id));
            if !touches_owner {
                continue;
            }
            records.push(TransferRecord {
                transfer_group: group,
                date: outgoing.date,
                amount: outgoing.amount,
                from_account: outgoing.account_id.unwrap_or(group),
                to_account: incoming.account_id.unwrap_or(group),
            });
            if records.len() >= limit {
                break;
            }
        }
        Ok(records)
    }

    fn owned_account(
        store: &dyn LedgerStore,
        owner: UserId,
        account_id: Uuid,
    ) -> Result<Account, EngineError> {
        store
            .account(account_id)?
            .filter(|account| account.owner == owner)
            .ok_or(EngineError::AccountNotFound(account_id))
    }
}
