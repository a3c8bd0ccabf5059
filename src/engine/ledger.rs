use crate::accrual::rate::RateCalculator;
use crate::accrual::snapshot::{AccrualSummary, DerivedSnapshot};
use crate::core::baseline::Baseline;
use crate::core::rule::{AccrualRule, RuleEdit, RuleId};
use crate::core::rule_set::AccrualRuleSet;
use crate::core::time::{minutes_between, truncate_to_minute};
use crate::engine::config::{LedgerConfig, ReseedPolicy};
use crate::engine::error::{LedgerError, Result, StoreError};
use crate::engine::store::{LedgerCommit, LedgerStore};
use crate::interchange::merge::{merge_rules, MergeReport};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;

/// The last committed baseline together with the rules it was computed under.
#[derive(Debug, Clone, Default)]
struct LedgerState {
    baseline: Option<Baseline>,
    rules: AccrualRuleSet,
}

impl LedgerState {
    /// Fold the time elapsed since the baseline into the baseline and into
    /// every rule's accumulators, under the rules as they currently stand.
    ///
    /// Returns the net amount folded in. A `now` before the baseline is a
    /// clock anomaly: nothing is folded and the baseline stays where it is.
    fn fold(&mut self, now: DateTime<Utc>) -> Result<Decimal> {
        let baseline = self.baseline.ok_or(LedgerError::Uninitialized)?;
        let now = truncate_to_minute(now);
        let elapsed = minutes_between(baseline.timestamp(), now);
        if elapsed < 0 {
            warn!(
                "clock moved backwards: now {} is {} minutes before baseline {}, folding nothing",
                now.to_rfc3339(),
                -elapsed,
                baseline.timestamp().to_rfc3339()
            );
            return Ok(Decimal::ZERO);
        }

        let window = RateCalculator::accrued_between(&self.rules, baseline.timestamp(), now)?;
        for accrual in &window.per_rule {
            if let Some(rule) = self.rules.get_mut(accrual.rule_id) {
                rule.accrue(accrual.minutes)?;
            }
        }
        let net = window.net();
        self.baseline = Some(baseline.advanced(now, net).ok_or(LedgerError::BalanceOverflow)?);
        debug!(
            "folded {} minutes into baseline: +{} income, -{} expense",
            elapsed, window.income, window.expense
        );
        Ok(net)
    }

    fn seeded_baseline(&self) -> Result<Baseline> {
        self.baseline.ok_or(LedgerError::Uninitialized)
    }
}

/// The accrual ledger.
///
/// Holds the baseline and the accrual rules, and keeps them in step with
/// a [`LedgerStore`]. Every state change first folds the time elapsed
/// since the baseline under the rules that were in force, so a changed
/// rule only ever applies from the moment of the change onwards.
///
/// Writers are serialized: each takes the state lock for its whole
/// compute, commit and publish sequence, and new state becomes visible
/// only after the store confirms the write. Readers see the last
/// published state.
///
/// # Examples
///
/// ```
/// use accrual_ledger::prelude::*;
/// use chrono::{Duration, TimeZone, Utc};
/// use rust_decimal_macros::dec;
///
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let engine = LedgerEngine::open(MemoryStore::new(), LedgerConfig::default()).unwrap();
/// engine.reseed(t0, dec!(1000)).unwrap();
///
/// let salary = AccrualRule::new("Salary", RuleKind::Income, dec!(9000), Frequency::Monthly, t0).unwrap();
/// engine.add_rule(salary, t0).unwrap();
///
/// let snapshot = engine.current_value(t0 + Duration::minutes(43_200)).unwrap();
/// assert_eq!(snapshot.amount, dec!(10000));
/// ```
pub struct LedgerEngine<S: LedgerStore> {
    state: RwLock<LedgerState>,
    store: Mutex<S>,
    config: LedgerConfig,
}

impl<S: LedgerStore> LedgerEngine<S> {
    /// Load the persisted baseline and rules from `store`.
    ///
    /// Every loaded rule is validated and its accumulated amount is derived
    /// again from its accumulated minutes.
    pub fn open(store: S, config: LedgerConfig) -> Result<Self> {
        let baseline = store.load_baseline().map_err(LedgerError::Load)?;
        let rules = store
            .load_rules()
            .map_err(LedgerError::Load)?
            .into_iter()
            .map(|mut rule| -> Result<AccrualRule> {
                let id = rule.id();
                rule.validate()
                    .and_then(|()| rule.recompute_accumulated_amount())
                    .map_err(|source| LedgerError::Load(StoreError::InvalidRule { id, source }))?;
                Ok(rule)
            })
            .collect::<Result<AccrualRuleSet>>()?;
        info!(
            "opened ledger: {} rules, {}",
            rules.len(),
            match baseline {
                Some(b) => format!("baseline {} at {}", b.amount(), b.timestamp().to_rfc3339()),
                None => "not seeded".to_string(),
            }
        );
        Ok(Self {
            state: RwLock::new(LedgerState { baseline, rules }),
            store: Mutex::new(store),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn is_seeded(&self) -> bool {
        self.state.read().baseline.is_some()
    }

    /// The last committed baseline.
    pub fn baseline(&self) -> Option<Baseline> {
        self.state.read().baseline
    }

    /// The rules as of the last committed baseline.
    pub fn rules(&self) -> AccrualRuleSet {
        self.state.read().rules.clone()
    }

    pub fn rule(&self, id: RuleId) -> Option<AccrualRule> {
        self.state.read().rules.get(id).cloned()
    }

    /// Run `f` against the underlying store while holding its lock.
    ///
    /// `f` must not call back into the engine.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.store.lock())
    }

    /// The ledger value at `now`, without changing anything.
    ///
    /// Before the first reseed this is a zero snapshot. If `now` lies
    /// before the baseline the baseline value is reported unchanged.
    pub fn current_value(&self, now: DateTime<Utc>) -> Result<DerivedSnapshot> {
        let state = self.state.read();
        let Some(baseline) = state.baseline else {
            return Ok(DerivedSnapshot::zero(truncate_to_minute(now)));
        };

        let mut as_of = truncate_to_minute(now);
        if as_of < baseline.timestamp() {
            warn!(
                "clock moved backwards: read at {} precedes baseline {}",
                as_of.to_rfc3339(),
                baseline.timestamp().to_rfc3339()
            );
            as_of = baseline.timestamp();
        }

        let window = RateCalculator::accrued_between(&state.rules, baseline.timestamp(), as_of)?;
        let rate = RateCalculator::net_rate(&state.rules, as_of)?;
        let amount = baseline
            .amount()
            .checked_add(window.net())
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(DerivedSnapshot {
            amount,
            income_rate_per_minute: rate.income,
            expense_rate_per_minute: rate.expense,
            net_rate_per_minute: rate.net,
            as_of,
        })
    }

    /// Summary totals over the rules as of the last committed baseline.
    pub fn summary(&self, at: DateTime<Utc>) -> Result<AccrualSummary> {
        Ok(RateCalculator::summarize(&self.state.read().rules, at)?)
    }

    /// Fold elapsed time into the baseline and rule accumulators, then
    /// move the baseline to `now`.
    pub fn rebase(&self, now: DateTime<Utc>) -> Result<Baseline> {
        self.write(|state| {
            state.fold(now)?;
            state.seeded_baseline()
        })
    }

    /// Rebase to `now`, then shift the baseline by `delta`.
    pub fn apply_external_delta(&self, delta: Decimal, now: DateTime<Utc>) -> Result<Baseline> {
        self.write(|state| {
            state.fold(now)?;
            let shifted = state
                .seeded_baseline()?
                .shifted(delta)
                .ok_or(LedgerError::BalanceOverflow)?;
            state.baseline = Some(shifted);
            Ok(shifted)
        })
    }

    /// Overwrite the baseline with `amount` at `now`.
    ///
    /// Elapsed time is not folded. Rule accumulators are kept or zeroed
    /// according to [`LedgerConfig::reseed_policy`].
    pub fn reseed(&self, now: DateTime<Utc>, amount: Decimal) -> Result<Baseline> {
        let policy = self.config.reseed_policy;
        self.write(|state| {
            if policy == ReseedPolicy::ResetAccumulators {
                state.rules.iter_mut().for_each(AccrualRule::reset_accumulators);
            }
            let baseline = Baseline::new(now, amount);
            state.baseline = Some(baseline);
            info!(
                "reseeded ledger to {} at {} ({:?})",
                amount,
                baseline.timestamp().to_rfc3339(),
                policy
            );
            Ok(baseline)
        })
    }

    /// Full data wipe: every rule is deleted and the baseline restarts at zero.
    ///
    /// Nothing survives a wipe, so there are no accumulators left for
    /// [`ReseedPolicy`] to act on. To zero the balance but keep the rules,
    /// use [`reseed`](Self::reseed) with a zero amount instead.
    pub fn wipe(&self, now: DateTime<Utc>) -> Result<Baseline> {
        self.write(|state| {
            let removed = state.rules.len();
            state.rules = AccrualRuleSet::new();
            let baseline = Baseline::zero(now);
            state.baseline = Some(baseline);
            info!("wiped ledger: {} rules removed", removed);
            Ok(baseline)
        })
    }

    /// Add a rule. It accrues from `now` onwards, whatever its `effective_from`.
    pub fn add_rule(&self, rule: AccrualRule, now: DateTime<Utc>) -> Result<RuleId> {
        rule.validate()?;
        self.write(|state| {
            state.fold(now)?;
            let mut rule = rule;
            if state.rules.contains(rule.id()) {
                rule.set_id(RuleId::new());
            }
            let id = rule.id();
            info!("added rule {} '{}' ({} {})", id, rule.name(), rule.period_amount(), rule.frequency());
            state.rules.upsert(rule);
            Ok(id)
        })
    }

    /// Change a rule's definition. The new terms apply from `now` onwards.
    pub fn edit_rule(&self, id: RuleId, edit: &RuleEdit, now: DateTime<Utc>) -> Result<AccrualRule> {
        self.write(|state| {
            state.fold(now)?;
            let rule = state.rules.get_mut(id).ok_or(LedgerError::RuleNotFound(id))?;
            rule.apply_edit(edit)?;
            Ok(rule.clone())
        })
    }

    /// Switch a rule on or off from `now` onwards.
    pub fn set_active(&self, id: RuleId, active: bool, now: DateTime<Utc>) -> Result<AccrualRule> {
        self.write(|state| {
            state.fold(now)?;
            let rule = state.rules.get_mut(id).ok_or(LedgerError::RuleNotFound(id))?;
            rule.set_active(active);
            Ok(rule.clone())
        })
    }

    /// Flip a rule's active flag. Returns the new flag.
    pub fn toggle_active(&self, id: RuleId, now: DateTime<Utc>) -> Result<bool> {
        self.write(|state| {
            state.fold(now)?;
            let rule = state.rules.get_mut(id).ok_or(LedgerError::RuleNotFound(id))?;
            let active = !rule.is_active();
            rule.set_active(active);
            Ok(active)
        })
    }

    /// Remove a rule after folding what it accrued up to `now`.
    pub fn delete_rule(&self, id: RuleId, now: DateTime<Utc>) -> Result<AccrualRule> {
        self.write(|state| {
            state.fold(now)?;
            let removed = state.rules.remove(id).ok_or(LedgerError::RuleNotFound(id))?;
            info!("deleted rule {} '{}'", id, removed.name());
            Ok(removed)
        })
    }

    /// Merge rules from an import into the local set. See [`merge_rules`].
    pub fn merge_imported_rules(
        &self,
        imported: Vec<AccrualRule>,
        now: DateTime<Utc>,
    ) -> Result<MergeReport> {
        self.write(|state| {
            state.fold(now)?;
            let outcome = merge_rules(&state.rules, imported)?;
            state.rules = outcome.rules;
            info!(
                "imported rules: {} merged, {} inserted",
                outcome.report.merged.len(),
                outcome.report.inserted.len()
            );
            Ok(outcome.report)
        })
    }

    /// Run `op` against a copy of the state, persist the result as one
    /// commit, and publish it only once the store accepted it.
    fn write<T>(&self, op: impl FnOnce(&mut LedgerState) -> Result<T>) -> Result<T> {
        let mut state = self.state.write();
        let mut next = state.clone();
        let output = op(&mut next)?;

        let baseline = next.seeded_baseline()?;
        let commit = LedgerCommit::between(baseline, &state.rules, &next.rules);
        if let Err(source) = self.store.lock().commit(&commit) {
            error!(
                "ledger commit rejected, keeping baseline {:?}: {}",
                state.baseline, source
            );
            return Err(LedgerError::RebaseFailed { source });
        }

        *state = next;
        Ok(output)
    }
}
