//! Entry points for collaborators that change the ledger from outside
//! the accrual rules: manual transactions, account balance edits and
//! rule imports.

use crate::core::baseline::Baseline;
use crate::core::rule::AccrualRule;
use crate::engine::error::{LedgerError, Result};
use crate::engine::ledger::LedgerEngine;
use crate::engine::store::LedgerStore;
use crate::interchange::merge::MergeReport;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a manual transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// Instantaneous changes pushed into the ledger by other parts of the app.
///
/// Every call folds elapsed accrual up to `at` before applying its change.
pub trait ExternalMutationGateway {
    /// A one-off income or expense of `amount` (positive).
    fn record_transaction(
        &self,
        kind: TransactionKind,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Baseline>;

    /// An account balance was edited from `previous` to `updated`.
    fn record_balance_edit(
        &self,
        previous: Decimal,
        updated: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Baseline>;

    /// Rules arrived from an import file.
    fn import_rules(&self, imported: Vec<AccrualRule>, at: DateTime<Utc>) -> Result<MergeReport>;
}

impl<S: LedgerStore> ExternalMutationGateway for LedgerEngine<S> {
    fn record_transaction(
        &self,
        kind: TransactionKind,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Baseline> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveTransaction(amount));
        }
        let delta = match kind {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        };
        self.apply_external_delta(delta, at)
    }

    fn record_balance_edit(
        &self,
        previous: Decimal,
        updated: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Baseline> {
        let delta = updated
            .checked_sub(previous)
            .ok_or(LedgerError::BalanceOverflow)?;
        self.apply_external_delta(delta, at)
    }

    fn import_rules(&self, imported: Vec<AccrualRule>, at: DateTime<Utc>) -> Result<MergeReport> {
        self.merge_imported_rules(imported, at)
    }
}
