use crate::core::baseline::Baseline;
use crate::core::rule::{AccrualRule, RuleId};
use crate::core::rule_set::AccrualRuleSet;
use crate::engine::error::StoreError;

/// One atomic unit of ledger persistence.
///
/// The baseline and every touched rule are written together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerCommit {
    pub baseline: Baseline,
    /// Rules to insert or overwrite (new rules and changed accumulators).
    pub upserts: Vec<AccrualRule>,
    pub deletes: Vec<RuleId>,
}

impl LedgerCommit {
    /// The commit that turns `before` into `after`.
    pub fn between(baseline: Baseline, before: &AccrualRuleSet, after: &AccrualRuleSet) -> Self {
        let upserts = after
            .iter()
            .filter(|rule| before.get(rule.id()) != Some(*rule))
            .cloned()
            .collect();
        let deletes = before
            .iter()
            .map(|rule| rule.id())
            .filter(|id| !after.contains(*id))
            .collect();
        Self {
            baseline,
            upserts,
            deletes,
        }
    }

    /// Apply to an in-memory copy of the stored rules.
    pub fn apply_to(&self, rules: &mut AccrualRuleSet) {
        for id in &self.deletes {
            rules.remove(*id);
        }
        for rule in &self.upserts {
            rules.upsert(rule.clone());
        }
    }
}

/// Record store holding the baseline and the accrual rules.
pub trait LedgerStore {
    fn load_baseline(&self) -> Result<Option<Baseline>, StoreError>;

    fn load_rules(&self) -> Result<Vec<AccrualRule>, StoreError>;

    /// Persist `commit` atomically. On error nothing of it may be visible.
    fn commit(&mut self, commit: &LedgerCommit) -> Result<(), StoreError>;
}

/// In-process store. Can be told to reject commits, for exercising
/// rollback paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    baseline: Option<Baseline>,
    rules: AccrualRuleSet,
    failures_pending: usize,
    commit_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `baseline` and `rules`.
    pub fn with_state(baseline: Option<Baseline>, rules: Vec<AccrualRule>) -> Self {
        Self {
            baseline,
            rules: rules.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Reject the next `count` commits.
    pub fn fail_next_commits(&mut self, count: usize) {
        self.failures_pending = count;
    }

    /// Number of commits accepted so far.
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    pub fn rules(&self) -> &AccrualRuleSet {
        &self.rules
    }
}

impl LedgerStore for MemoryStore {
    fn load_baseline(&self) -> Result<Option<Baseline>, StoreError> {
        Ok(self.baseline)
    }

    fn load_rules(&self) -> Result<Vec<AccrualRule>, StoreError> {
        Ok(self.rules.rules().to_vec())
    }

    fn commit(&mut self, commit: &LedgerCommit) -> Result<(), StoreError> {
        if self.failures_pending > 0 {
            self.failures_pending -= 1;
            return Err(StoreError::Rejected("injected commit failure".to_string()));
        }
        commit.apply_to(&mut self.rules);
        self.baseline = Some(commit.baseline);
        self.commit_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frequency::Frequency;
    use crate::core::rule::RuleKind;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn rule(name: &str) -> AccrualRule {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AccrualRule::new(name, RuleKind::Income, dec!(10), Frequency::Daily, start).unwrap()
    }

    #[test]
    fn test_commit_between_detects_changes() {
        let kept = rule("Kept");
        let changed = rule("Changed");
        let dropped = rule("Dropped");
        let before: AccrualRuleSet = vec![kept.clone(), changed.clone(), dropped.clone()]
            .into_iter()
            .collect();

        let mut after = before.clone();
        after.remove(dropped.id());
        after.get_mut(changed.id()).unwrap().accrue(60).unwrap();
        let added = rule("Added");
        after.upsert(added.clone());

        let baseline = Baseline::zero(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        let commit = LedgerCommit::between(baseline, &before, &after);
        let upserted: Vec<_> = commit.upserts.iter().map(|r| r.id()).collect();
        assert_eq!(upserted, vec![changed.id(), added.id()]);
        assert_eq!(commit.deletes, vec![dropped.id()]);

        let mut replayed = before.clone();
        commit.apply_to(&mut replayed);
        assert_eq!(replayed.len(), after.len());
        assert!(!replayed.contains(dropped.id()));
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let mut store = MemoryStore::new();
        let baseline = Baseline::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), dec!(5));
        let commit = LedgerCommit {
            baseline,
            upserts: vec![rule("Salary")],
            deletes: vec![],
        };

        store.fail_next_commits(1);
        assert!(store.commit(&commit).is_err());
        assert_eq!(store.baseline(), None);
        assert!(store.rules().is_empty());

        store.commit(&commit).unwrap();
        assert_eq!(store.baseline(), Some(baseline));
        assert_eq!(store.rules().len(), 1);
        assert_eq!(store.commit_count(), 1);
    }
}
