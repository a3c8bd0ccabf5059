use crate::core::rule::{AccrualRule, RuleId, RuleKind};
use serde::{Deserialize, Serialize};

/// The collection of accrual rules the ledger reads rates from.
///
/// Rules keep their insertion order so listings and exports are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccrualRuleSet {
    rules: Vec<AccrualRule>,
}

impl AccrualRuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Insert a rule, replacing any existing rule with the same ID.
    pub fn upsert(&mut self, rule: AccrualRule) {
        match self.rules.iter_mut().find(|r| r.id() == rule.id()) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn remove(&mut self, id: RuleId) -> Option<AccrualRule> {
        let idx = self.rules.iter().position(|r| r.id() == id)?;
        Some(self.rules.remove(idx))
    }

    pub fn get(&self, id: RuleId) -> Option<&AccrualRule> {
        self.rules.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: RuleId) -> Option<&mut AccrualRule> {
        self.rules.iter_mut().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: RuleId) -> bool {
        self.get(id).is_some()
    }

    /// Find the rule with the given `(name, kind)` merge key.
    pub fn find_by_key(&self, name: &str, kind: RuleKind) -> Option<&AccrualRule> {
        self.rules.iter().find(|r| r.merge_key() == (name, kind))
    }

    pub fn rules(&self) -> &[AccrualRule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccrualRule> {
        self.rules.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AccrualRule> {
        self.rules.iter_mut()
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn into_vec(self) -> Vec<AccrualRule> {
        self.rules
    }
}

impl FromIterator<AccrualRule> for AccrualRuleSet {
    fn from_iter<T: IntoIterator<Item = AccrualRule>>(iter: T) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.upsert(rule);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frequency::Frequency;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn rule(name: &str, kind: RuleKind) -> AccrualRule {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        AccrualRule::new(name, kind, dec!(100), Frequency::Weekly, start).unwrap()
    }

    #[test]
    fn test_upsert_replaces_same_id() {
        let mut set = AccrualRuleSet::new();
        let original = rule("Salary", RuleKind::Income);
        let id = original.id();
        set.upsert(original.clone());
        set.upsert(original.with_active(false));
        assert_eq!(set.len(), 1);
        assert!(!set.get(id).unwrap().is_active());
    }

    #[test]
    fn test_find_by_key_respects_kind() {
        let set: AccrualRuleSet = vec![
            rule("Bonus", RuleKind::Income),
            rule("Bonus", RuleKind::Expense),
        ]
        .into_iter()
        .collect();

        let found = set.find_by_key("Bonus", RuleKind::Expense).unwrap();
        assert_eq!(found.kind(), RuleKind::Expense);
        assert!(set.find_by_key("Salary", RuleKind::Income).is_none());
    }

    #[test]
    fn test_remove() {
        let mut set = AccrualRuleSet::new();
        let r = rule("Rent", RuleKind::Expense);
        let id = r.id();
        set.upsert(r);
        assert!(set.remove(id).is_some());
        assert!(set.is_empty());
        assert!(set.remove(id).is_none());
    }
}
