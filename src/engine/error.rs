use crate::core::rule::{RuleError, RuleId};
use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures reported by a [`LedgerStore`](crate::engine::store::LedgerStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store rejected write: {0}")]
    Rejected(String),
    #[error("stored rule {id} is invalid: {source}")]
    InvalidRule { id: RuleId, source: RuleError },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A state-changing operation ran before the first reseed.
    #[error("ledger has not been seeded")]
    Uninitialized,
    /// The store refused the atomic write. In-memory state is unchanged.
    #[error("ledger write was not persisted, state kept at last committed baseline: {source}")]
    RebaseFailed { source: StoreError },
    #[error("failed to load ledger state: {0}")]
    Load(#[source] StoreError),
    #[error("no accrual rule with id {0}")]
    RuleNotFound(RuleId),
    #[error("invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
    #[error("transaction amount must be positive, got {0}")]
    NonPositiveTransaction(Decimal),
    /// The ledger value would leave the decimal range. Nothing was changed.
    #[error("ledger balance exceeds the decimal range")]
    BalanceOverflow,
}

impl LedgerError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::RebaseFailed { .. })
    }
}
