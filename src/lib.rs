//! # accrual-ledger
//!
//! Continuous-time accrual ledger for recurring income and expense rules.
//!
//! A small set of rules ("salary, 9000 monthly", "rent, 3000 monthly")
//! implies a balance that changes every minute. Instead of materializing
//! a value per minute, the ledger keeps one exact baseline and folds
//! elapsed time into it whenever something changes, so the balance can be
//! read exactly at any instant and a rule change never reaches back into
//! time that already passed under the old terms.
//!
//! ## Architecture
//!
//! - **core** — Rules, frequencies, the rule set, the baseline, minute-precision time
//! - **accrual** — Rate and proration math, snapshots and summaries
//! - **engine** — The ledger engine, its store contract, and the external mutation gateway
//! - **interchange** — Import merge semantics and the export document
//! - **simulation** — Random rule-set generation for stress testing

pub mod accrual;
pub mod core;
pub mod engine;
pub mod interchange;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accrual::rate::{RateBreakdown, RateCalculator};
    pub use crate::accrual::snapshot::{AccrualSummary, DerivedSnapshot};
    pub use crate::core::baseline::Baseline;
    pub use crate::core::frequency::Frequency;
    pub use crate::core::rule::{AccrualRule, RuleEdit, RuleId, RuleKind};
    pub use crate::core::rule_set::AccrualRuleSet;
    pub use crate::engine::config::{LedgerConfig, ReseedPolicy};
    pub use crate::engine::error::{LedgerError, StoreError};
    pub use crate::engine::file_store::JsonFileStore;
    pub use crate::engine::gateway::{ExternalMutationGateway, TransactionKind};
    pub use crate::engine::ledger::LedgerEngine;
    pub use crate::engine::store::{LedgerStore, MemoryStore};
    pub use crate::interchange::merge::MergeReport;
}
