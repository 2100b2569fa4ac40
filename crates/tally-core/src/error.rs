use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any write; safe to surface to the caller.
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),
    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),
    /// A state the sequencing rules should make unreachable. Treated as a
    /// local bug; the operation aborts instead of retrying blindly.
    #[error("Consistency violation: {0}")]
    Consistency(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
