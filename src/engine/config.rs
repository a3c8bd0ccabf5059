use serde::{Deserialize, Serialize};

/// What a reseed does to the per-rule accumulators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReseedPolicy {
    /// Reseed only overwrites the baseline; rules keep their history.
    #[default]
    KeepAccumulators,
    /// Reseed also zeroes every rule's accumulated minutes and amount.
    ResetAccumulators,
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub reseed_policy: ReseedPolicy,
}

impl LedgerConfig {
    pub fn with_reseed_policy(mut self, policy: ReseedPolicy) -> Self {
        self.reseed_policy = policy;
        self
    }
}
