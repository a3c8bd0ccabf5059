use crate::core::rule::{AccrualRule, RuleError, RuleId};
use crate::core::rule_set::AccrualRuleSet;
use serde::{Deserialize, Serialize};

/// What an import did to the local rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Local rules whose accumulators absorbed an imported rule.
    pub merged: Vec<RuleId>,
    /// Imported rules added as new local rules.
    pub inserted: Vec<RuleId>,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.merged.len() + self.inserted.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub rules: AccrualRuleSet,
    pub report: MergeReport,
}

/// Merge imported rules into `local`.
///
/// An imported rule whose `(name, kind)` matches a local rule adds its
/// accumulated minutes to the local rule; the accumulated amount is then
/// derived again from the summed minutes under the local rule's terms.
/// The two amounts are never added together, since each already carries
/// its own proration. Unmatched rules are inserted with the minutes they
/// arrived with, under a fresh ID if theirs is already taken.
pub fn merge_rules(
    local: &AccrualRuleSet,
    imported: Vec<AccrualRule>,
) -> Result<MergeOutcome, RuleError> {
    let mut rules = local.clone();
    let mut report = MergeReport::default();

    for incoming in imported {
        incoming.validate()?;
        let (name, kind) = incoming.merge_key();
        let matched = rules.find_by_key(name, kind).map(|r| r.id());

        match matched.and_then(|id| rules.get_mut(id)) {
            Some(existing) => {
                let minutes = existing
                    .accumulated_minutes()
                    .checked_add(incoming.accumulated_minutes())
                    .ok_or(RuleError::AccrualOverflow)?;
                *existing = existing.clone().with_accumulated_minutes(minutes)?;
                report.merged.push(existing.id());
            }
            None => {
                let minutes = incoming.accumulated_minutes();
                let mut fresh = incoming.with_accumulated_minutes(minutes)?;
                if rules.contains(fresh.id()) {
                    fresh.set_id(RuleId::new());
                }
                report.inserted.push(fresh.id());
                rules.upsert(fresh);
            }
        }
    }

    Ok(MergeOutcome { rules, report })
}
