use crate::accrual::rate::prorate;
use crate::core::frequency::Frequency;
use crate::core::time::{minutes_between, plus_minutes, truncate_to_minute};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of an accrual rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a rule adds to or draws from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    Income,
    Expense,
}

impl RuleKind {
    /// `+1` for income, `-1` for expense.
    pub fn sign(&self) -> Decimal {
        match self {
            RuleKind::Income => Decimal::ONE,
            RuleKind::Expense => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Income => f.write_str("INCOME"),
            RuleKind::Expense => f.write_str("EXPENSE"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(RuleKind::Income),
            "expense" => Ok(RuleKind::Expense),
            _ => Err(RuleError::UnknownKind(s.to_string())),
        }
    }
}

/// Validation failures for rule definitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("period amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("rule name must not be empty")]
    EmptyName,
    #[error("effective window ends ({until}) before it starts ({from})")]
    InvertedWindow {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
    #[error("unknown rule kind '{0}', expected income or expense")]
    UnknownKind(String),
    #[error("accrued amount exceeds the decimal range")]
    AccrualOverflow,
}

/// A recurring fixed income or expense.
///
/// The rule pays `period_amount` once per `frequency` cycle, accrued
/// continuously minute by minute while the rule is effective. The rule
/// also carries its own accumulators: how many minutes it has been
/// effective so far, and the amount those minutes are worth.
///
/// `accumulated_amount` is always derived from `accumulated_minutes`;
/// nothing sets it independently.
///
/// # Examples
///
/// ```
/// use accrual_ledger::core::frequency::Frequency;
/// use accrual_ledger::core::rule::{AccrualRule, RuleKind};
/// use chrono::{TimeZone, Utc};
/// use rust_decimal_macros::dec;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let mut salary = AccrualRule::new("Salary", RuleKind::Income, dec!(9000), Frequency::Monthly, start)
///     .unwrap();
///
/// salary.accrue(21_600).unwrap();
/// assert_eq!(salary.accumulated_amount(), dec!(4500));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualRule {
    id: RuleId,
    name: String,
    kind: RuleKind,
    /// Amount paid per cycle. Always positive.
    period_amount: Decimal,
    frequency: Frequency,
    effective_from: DateTime<Utc>,
    /// Inclusive last effective minute, if the rule ends.
    effective_until: Option<DateTime<Utc>>,
    active: bool,
    accumulated_minutes: u64,
    accumulated_amount: Decimal,
}

impl AccrualRule {
    /// Create an active rule with empty accumulators.
    pub fn new(
        name: impl Into<String>,
        kind: RuleKind,
        period_amount: Decimal,
        frequency: Frequency,
        effective_from: DateTime<Utc>,
    ) -> Result<Self, RuleError> {
        let name = name.into();
        validate_name(&name)?;
        validate_amount(period_amount)?;
        Ok(Self {
            id: RuleId::new(),
            name,
            kind,
            period_amount,
            frequency,
            effective_from: truncate_to_minute(effective_from),
            effective_until: None,
            active: true,
            accumulated_minutes: 0,
            accumulated_amount: Decimal::ZERO,
        })
    }

    /// Set a specific ID (useful for testing / determinism).
    pub fn with_id(mut self, id: RuleId) -> Self {
        self.id = id;
        self
    }

    /// Close the effective window at `until` (inclusive).
    pub fn with_effective_until(mut self, until: DateTime<Utc>) -> Result<Self, RuleError> {
        let until = truncate_to_minute(until);
        validate_window(self.effective_from, Some(until))?;
        self.effective_until = Some(until);
        Ok(self)
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Replace the accumulators with `minutes`, deriving the amount.
    pub fn with_accumulated_minutes(mut self, minutes: u64) -> Result<Self, RuleError> {
        self.accumulated_amount = prorate(self.period_amount, self.frequency, minutes)?;
        self.accumulated_minutes = minutes;
        Ok(self)
    }

    // --- Accessors ---

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn period_amount(&self) -> Decimal {
        self.period_amount
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn effective_from(&self) -> DateTime<Utc> {
        self.effective_from
    }

    pub fn effective_until(&self) -> Option<DateTime<Utc>> {
        self.effective_until
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn accumulated_minutes(&self) -> u64 {
        self.accumulated_minutes
    }

    pub fn accumulated_amount(&self) -> Decimal {
        self.accumulated_amount
    }

    /// Key used to match rules across devices on import.
    pub fn merge_key(&self) -> (&str, RuleKind) {
        (&self.name, self.kind)
    }

    /// Whether the rule contributes to the rate at instant `at`.
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        let at = truncate_to_minute(at);
        self.active
            && at >= self.effective_from
            && self.effective_until.map_or(true, |until| at <= until)
    }

    /// Number of minutes in `[start, end)` during which the rule is effective.
    pub fn effective_minutes_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
        if !self.active {
            return 0;
        }
        let lo = truncate_to_minute(start).max(self.effective_from);
        let end = truncate_to_minute(end);
        let hi = match self.effective_until {
            Some(until) => end.min(plus_minutes(until, 1)),
            None => end,
        };
        u64::try_from(minutes_between(lo, hi)).unwrap_or(0)
    }

    /// Add `minutes` of effective time and return the change in `accumulated_amount`.
    ///
    /// On overflow the accumulators are left as they were.
    pub fn accrue(&mut self, minutes: u64) -> Result<Decimal, RuleError> {
        if minutes == 0 {
            return Ok(Decimal::ZERO);
        }
        let total = self
            .accumulated_minutes
            .checked_add(minutes)
            .ok_or(RuleError::AccrualOverflow)?;
        let amount = prorate(self.period_amount, self.frequency, total)?;
        let delta = amount - self.accumulated_amount;
        self.accumulated_minutes = total;
        self.accumulated_amount = amount;
        Ok(delta)
    }

    pub fn reset_accumulators(&mut self) {
        self.accumulated_minutes = 0;
        self.accumulated_amount = Decimal::ZERO;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_id(&mut self, id: RuleId) {
        self.id = id;
    }

    /// Apply a structural edit. Accumulated minutes are preserved and the
    /// accumulated amount is re-derived under the edited terms.
    pub fn apply_edit(&mut self, edit: &RuleEdit) -> Result<(), RuleError> {
        if let Some(name) = &edit.name {
            validate_name(name)?;
        }
        if let Some(amount) = edit.period_amount {
            validate_amount(amount)?;
        }
        let from = edit
            .effective_from
            .map(truncate_to_minute)
            .unwrap_or(self.effective_from);
        let until = match edit.effective_until {
            Some(until) => until.map(truncate_to_minute),
            None => self.effective_until,
        };
        validate_window(from, until)?;
        let amount = edit.period_amount.unwrap_or(self.period_amount);
        let frequency = edit.frequency.unwrap_or(self.frequency);
        let accumulated = prorate(amount, frequency, self.accumulated_minutes)?;

        if let Some(name) = &edit.name {
            self.name = name.clone();
        }
        if let Some(kind) = edit.kind {
            self.kind = kind;
        }
        self.period_amount = amount;
        self.frequency = frequency;
        self.effective_from = from;
        self.effective_until = until;
        self.accumulated_amount = accumulated;
        Ok(())
    }

    /// Re-check invariants on a rule that arrived from outside (import, store).
    pub fn validate(&self) -> Result<(), RuleError> {
        validate_name(&self.name)?;
        validate_amount(self.period_amount)?;
        validate_window(self.effective_from, self.effective_until)
    }

    /// Derive `accumulated_amount` again from `accumulated_minutes`.
    pub(crate) fn recompute_accumulated_amount(&mut self) -> Result<(), RuleError> {
        self.accumulated_amount = prorate(self.period_amount, self.frequency, self.accumulated_minutes)?;
        Ok(())
    }
}

/// A partial edit to a rule's definition. `None` leaves a field unchanged.
///
/// `effective_until` is doubly optional: `Some(None)` removes the end date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleEdit {
    pub name: Option<String>,
    pub kind: Option<RuleKind>,
    pub period_amount: Option<Decimal>,
    pub frequency: Option<Frequency>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<Option<DateTime<Utc>>>,
}

impl RuleEdit {
    pub fn amount(amount: Decimal) -> Self {
        Self {
            period_amount: Some(amount),
            ..Default::default()
        }
    }
}

fn validate_name(name: &str) -> Result<(), RuleError> {
    if name.trim().is_empty() {
        return Err(RuleError::EmptyName);
    }
    Ok(())
}

fn validate_amount(amount: Decimal) -> Result<(), RuleError> {
    if amount <= Decimal::ZERO {
        return Err(RuleError::NonPositiveAmount(amount));
    }
    Ok(())
}

fn validate_window(from: DateTime<Utc>, until: Option<DateTime<Utc>>) -> Result<(), RuleError> {
    match until {
        Some(until) if until < from => Err(RuleError::InvertedWindow { from, until }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn rent() -> AccrualRule {
        AccrualRule::new("Rent", RuleKind::Expense, dec!(3000), Frequency::Monthly, t0()).unwrap()
    }

    #[test]
    fn test_rule_creation() {
        let rule = rent();
        assert_eq!(rule.name(), "Rent");
        assert_eq!(rule.kind(), RuleKind::Expense);
        assert!(rule.is_active());
        assert_eq!(rule.accumulated_minutes(), 0);
        assert_eq!(rule.accumulated_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_rule_rejects_non_positive_amount() {
        let err = AccrualRule::new("Rent", RuleKind::Expense, Decimal::ZERO, Frequency::Monthly, t0())
            .unwrap_err();
        assert_eq!(err, RuleError::NonPositiveAmount(Decimal::ZERO));
    }

    #[test]
    fn test_rule_rejects_blank_name() {
        let err = AccrualRule::new("  ", RuleKind::Income, dec!(1), Frequency::Daily, t0()).unwrap_err();
        assert_eq!(err, RuleError::EmptyName);
    }

    #[test]
    fn test_rule_rejects_inverted_window() {
        let err = rent()
            .with_effective_until(t0() - chrono::Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, RuleError::InvertedWindow { .. }));
    }

    #[test]
    fn test_effectiveness_window_is_inclusive() {
        let until = t0() + chrono::Duration::minutes(10);
        let rule = rent().with_effective_until(until).unwrap();
        assert!(!rule.is_effective_at(t0() - chrono::Duration::minutes(1)));
        assert!(rule.is_effective_at(t0()));
        assert!(rule.is_effective_at(until));
        assert!(!rule.is_effective_at(until + chrono::Duration::minutes(1)));
    }

    #[test]
    fn test_inactive_rule_is_never_effective() {
        let rule = rent().with_active(false);
        assert!(!rule.is_effective_at(t0()));
        assert_eq!(
            rule.effective_minutes_between(t0(), t0() + chrono::Duration::days(3)),
            0
        );
    }

    #[test]
    fn test_effective_minutes_clipped_to_window() {
        let start = t0() + chrono::Duration::minutes(5);
        let rule = AccrualRule::new("Gym", RuleKind::Expense, dec!(30), Frequency::Monthly, start)
            .unwrap()
            .with_effective_until(start + chrono::Duration::minutes(9))
            .unwrap();
        // Effective minutes are 5..=14, i.e. ten of them.
        let minutes = rule.effective_minutes_between(t0(), t0() + chrono::Duration::hours(1));
        assert_eq!(minutes, 10);
        // A window entirely before the rule starts contributes nothing.
        assert_eq!(rule.effective_minutes_between(t0(), start), 0);
    }

    #[test]
    fn test_accrue_full_cycle() {
        let mut rule = rent();
        let delta = rule.accrue(43_200).unwrap();
        assert_eq!(delta, dec!(3000));
        assert_eq!(rule.accumulated_amount(), dec!(3000));
    }

    #[test]
    fn test_accrue_overflow_keeps_accumulators() {
        let mut rule = AccrualRule::new("Payout", RuleKind::Income, Decimal::MAX, Frequency::Daily, t0())
            .unwrap();
        rule.accrue(1_440).unwrap();

        assert_eq!(rule.accrue(1_440), Err(RuleError::AccrualOverflow));
        assert_eq!(rule.accumulated_minutes(), 1_440);
        assert_eq!(rule.accumulated_amount(), Decimal::MAX);

        let mut rent = rent().with_accumulated_minutes(u64::MAX - 1).unwrap();
        assert_eq!(rent.accrue(2), Err(RuleError::AccrualOverflow));
    }

    #[test]
    fn test_accumulated_minutes_out_of_range() {
        let big = AccrualRule::new("Payout", RuleKind::Income, dec!(1000000000000000), Frequency::Daily, t0())
            .unwrap();
        assert_eq!(
            big.with_accumulated_minutes(u64::MAX).unwrap_err(),
            RuleError::AccrualOverflow
        );
    }

    #[test]
    fn test_edit_rederives_amount_from_minutes() {
        let mut rule = rent().with_accumulated_minutes(21_600).unwrap();
        assert_eq!(rule.accumulated_amount(), dec!(1500));

        rule.apply_edit(&RuleEdit::amount(dec!(4000))).unwrap();
        assert_eq!(rule.accumulated_minutes(), 21_600);
        assert_eq!(rule.accumulated_amount(), dec!(2000));
    }

    #[test]
    fn test_edit_can_clear_end_date() {
        let mut rule = rent().with_effective_until(t0() + chrono::Duration::days(1)).unwrap();
        let edit = RuleEdit {
            effective_until: Some(None),
            ..Default::default()
        };
        rule.apply_edit(&edit).unwrap();
        assert_eq!(rule.effective_until(), None);
    }

    #[test]
    fn test_invalid_edit_leaves_rule_untouched() {
        let mut rule = rent();
        let edit = RuleEdit {
            name: Some("Flat".into()),
            period_amount: Some(dec!(-1)),
            ..Default::default()
        };
        assert!(rule.apply_edit(&edit).is_err());
        assert_eq!(rule.name(), "Rent");
        assert_eq!(rule.period_amount(), dec!(3000));
    }
}
