use crate::accrual::snapshot::AccrualSummary;
use crate::core::frequency::Frequency;
use crate::core::rule::{AccrualRule, RuleError, RuleId, RuleKind};
use crate::core::rule_set::AccrualRuleSet;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places kept for the prorated part of an accrued amount.
///
/// Full cycles are always exact; only the partial-cycle remainder is
/// rounded, which keeps repeated folds into the baseline exact.
pub const ACCRUAL_SCALE: u32 = 10;

/// Amount accrued by `minutes` of effective time at `period_amount` per cycle.
///
/// `floor(m / cycle) * amount + (m mod cycle) * amount / cycle`: full cycles
/// count at full value and the remainder is prorated linearly.
///
/// Fails with [`RuleError::AccrualOverflow`] when the result does not fit
/// in a `Decimal`.
pub fn prorate(period_amount: Decimal, frequency: Frequency, minutes: u64) -> Result<Decimal, RuleError> {
    let cycle = frequency.minutes_per_cycle();
    let full_cycles = Decimal::from(minutes / cycle)
        .checked_mul(period_amount)
        .ok_or(RuleError::AccrualOverflow)?;
    let remainder = minutes % cycle;
    if remainder == 0 {
        return Ok(full_cycles);
    }
    let partial = Decimal::from(remainder)
        .checked_mul(period_amount)
        .and_then(|p| p.checked_div(Decimal::from(cycle)))
        .ok_or(RuleError::AccrualOverflow)?;
    full_cycles
        .checked_add(partial.round_dp(ACCRUAL_SCALE))
        .ok_or(RuleError::AccrualOverflow)
}

fn add_to(total: &mut Decimal, amount: Decimal) -> Result<(), RuleError> {
    *total = total.checked_add(amount).ok_or(RuleError::AccrualOverflow)?;
    Ok(())
}

/// Income, expense and net rate per minute at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBreakdown {
    /// Sum of per-minute rates of effective income rules.
    pub income: Decimal,
    /// Sum of per-minute rates of effective expense rules (non-negative).
    pub expense: Decimal,
    /// `income - expense`.
    pub net: Decimal,
}

/// What one rule earns or costs over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleAccrual {
    pub rule_id: RuleId,
    pub kind: RuleKind,
    /// Minutes of the window during which the rule was effective.
    pub minutes: u64,
    /// Increase of the rule's accumulated amount (always non-negative).
    pub amount: Decimal,
}

impl RuleAccrual {
    /// Contribution to the ledger: positive for income, negative for expense.
    pub fn signed_amount(&self) -> Decimal {
        self.kind.sign() * self.amount
    }
}

/// Accrual of a whole rule set over `[start, end)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowAccrual {
    pub per_rule: Vec<RuleAccrual>,
    pub income: Decimal,
    pub expense: Decimal,
}

impl WindowAccrual {
    /// Net change to the ledger over the window.
    pub fn net(&self) -> Decimal {
        self.income - self.expense
    }
}

/// Pure rate and proration math over accrual rules.
pub struct RateCalculator;

impl RateCalculator {
    /// `period_amount / minutes_per_cycle`.
    pub fn rate_per_minute(rule: &AccrualRule) -> Decimal {
        rule.period_amount() / Decimal::from(rule.frequency().minutes_per_cycle())
    }

    /// Rates of all rules effective at `at`, split by kind.
    pub fn net_rate(rules: &AccrualRuleSet, at: DateTime<Utc>) -> Result<RateBreakdown, RuleError> {
        let mut breakdown = RateBreakdown::default();
        for rule in rules.iter().filter(|r| r.is_effective_at(at)) {
            let rate = Self::rate_per_minute(rule);
            match rule.kind() {
                RuleKind::Income => add_to(&mut breakdown.income, rate)?,
                RuleKind::Expense => add_to(&mut breakdown.expense, rate)?,
            }
        }
        breakdown.net = breakdown.income - breakdown.expense;
        Ok(breakdown)
    }

    /// Accumulated amount for `minutes` of effective time under `rule`'s terms.
    pub fn accumulated_amount(rule: &AccrualRule, minutes: u64) -> Result<Decimal, RuleError> {
        prorate(rule.period_amount(), rule.frequency(), minutes)
    }

    /// What every rule accrues over `[start, end)`, continuing from its
    /// current accumulators.
    ///
    /// Each rule only counts the minutes it was effective, so a rule whose
    /// window opens or closes inside the interval contributes exactly its
    /// share. The amounts are differences of accumulated amounts, which
    /// keeps them consistent with what [`AccrualRule::accrue`] will record.
    pub fn accrued_between(
        rules: &AccrualRuleSet,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<WindowAccrual, RuleError> {
        let mut window = WindowAccrual::default();
        for rule in rules.iter() {
            let minutes = rule.effective_minutes_between(start, end);
            if minutes == 0 {
                continue;
            }
            let total = rule
                .accumulated_minutes()
                .checked_add(minutes)
                .ok_or(RuleError::AccrualOverflow)?;
            let before = Self::accumulated_amount(rule, rule.accumulated_minutes())?;
            let amount = Self::accumulated_amount(rule, total)? - before;
            match rule.kind() {
                RuleKind::Income => add_to(&mut window.income, amount)?,
                RuleKind::Expense => add_to(&mut window.expense, amount)?,
            }
            window.per_rule.push(RuleAccrual {
                rule_id: rule.id(),
                kind: rule.kind(),
                minutes,
                amount,
            });
        }
        Ok(window)
    }

    /// Totals for summary screens: what has accrued so far, and what the
    /// rules effective at `at` are worth per (30-day) month.
    pub fn summarize(rules: &AccrualRuleSet, at: DateTime<Utc>) -> Result<AccrualSummary, RuleError> {
        let mut summary = AccrualSummary::default();
        for rule in rules.iter() {
            match rule.kind() {
                RuleKind::Income => add_to(&mut summary.accrued_income, rule.accumulated_amount())?,
                RuleKind::Expense => add_to(&mut summary.accrued_expense, rule.accumulated_amount())?,
            }
            if !rule.is_effective_at(at) {
                continue;
            }
            summary.effective_rules += 1;
            let monthly = rule
                .period_amount()
                .checked_mul(rule.frequency().cycles_per_month())
                .ok_or(RuleError::AccrualOverflow)?;
            match rule.kind() {
                RuleKind::Income => add_to(&mut summary.monthly_income, monthly)?,
                RuleKind::Expense => add_to(&mut summary.monthly_expense, monthly)?,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn salary() -> AccrualRule {
        AccrualRule::new("Salary", RuleKind::Income, dec!(9000), Frequency::Monthly, t0()).unwrap()
    }

    fn rent() -> AccrualRule {
        AccrualRule::new("Rent", RuleKind::Expense, dec!(3000), Frequency::Monthly, t0()).unwrap()
    }

    #[test]
    fn test_full_cycle_is_exact_for_every_frequency() {
        for frequency in Frequency::ALL {
            let amount = dec!(1234.57);
            assert_eq!(prorate(amount, frequency, frequency.minutes_per_cycle()), Ok(amount));
        }
    }

    #[test]
    fn test_prorate_cycles_and_remainder() {
        // 1.5 days of a 100/day rule.
        assert_eq!(prorate(dec!(100), Frequency::Daily, 2_160), Ok(dec!(150)));
        assert_eq!(prorate(dec!(100), Frequency::Daily, 0), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_prorate_reports_overflow() {
        let huge = dec!(1000000000000000);
        assert_eq!(prorate(huge, Frequency::Daily, u64::MAX), Err(RuleError::AccrualOverflow));
        assert_eq!(prorate(Decimal::MAX, Frequency::Daily, 2_880), Err(RuleError::AccrualOverflow));
        // A single cycle of the largest amount still fits.
        assert_eq!(prorate(Decimal::MAX, Frequency::Daily, 1_440), Ok(Decimal::MAX));
    }

    #[test]
    fn test_prorate_rounds_only_the_remainder() {
        let one_minute = prorate(dec!(9000), Frequency::Monthly, 1).unwrap();
        assert_eq!(one_minute, dec!(0.2083333333));
    }

    #[test]
    fn test_rate_per_minute() {
        let rule = AccrualRule::new("Coffee", RuleKind::Expense, dec!(144), Frequency::Daily, t0()).unwrap();
        assert_eq!(RateCalculator::rate_per_minute(&rule), dec!(0.1));
    }

    #[test]
    fn test_net_rate_splits_income_and_expense() {
        let daily_in = AccrualRule::new("Tips", RuleKind::Income, dec!(1440), Frequency::Daily, t0()).unwrap();
        let daily_out = AccrualRule::new("Food", RuleKind::Expense, dec!(144), Frequency::Daily, t0()).unwrap();
        let rules: AccrualRuleSet = vec![daily_in, daily_out].into_iter().collect();

        let rate = RateCalculator::net_rate(&rules, t0()).unwrap();
        assert_eq!(rate.income, dec!(1));
        assert_eq!(rate.expense, dec!(0.1));
        assert_eq!(rate.net, dec!(0.9));
    }

    #[test]
    fn test_net_rate_skips_ineffective_rules() {
        let rules: AccrualRuleSet = vec![salary().with_active(false), rent()].into_iter().collect();
        let rate = RateCalculator::net_rate(&rules, t0()).unwrap();
        assert_eq!(rate.income, Decimal::ZERO);
        assert!(rate.net < Decimal::ZERO);

        let before_start = RateCalculator::net_rate(&rules, t0() - Duration::minutes(1)).unwrap();
        assert_eq!(before_start, RateBreakdown::default());
    }

    #[test]
    fn test_accrued_between_full_month() {
        let rules: AccrualRuleSet = vec![salary(), rent()].into_iter().collect();
        let window = RateCalculator::accrued_between(&rules, t0(), t0() + Duration::minutes(43_200)).unwrap();
        assert_eq!(window.income, dec!(9000));
        assert_eq!(window.expense, dec!(3000));
        assert_eq!(window.net(), dec!(6000));
        assert_eq!(window.per_rule.len(), 2);
    }

    #[test]
    fn test_accrued_between_honours_end_date() {
        let ending = rent()
            .with_effective_until(t0() + Duration::minutes(21_599))
            .unwrap();
        let rules: AccrualRuleSet = vec![ending].into_iter().collect();
        let window = RateCalculator::accrued_between(&rules, t0(), t0() + Duration::minutes(43_200)).unwrap();
        assert_eq!(window.per_rule[0].minutes, 21_600);
        assert_eq!(window.expense, dec!(1500));
        assert_eq!(window.per_rule[0].signed_amount(), dec!(-1500));
    }

    #[test]
    fn test_summarize() {
        let weekly = AccrualRule::new("Allowance", RuleKind::Income, dec!(70), Frequency::Weekly, t0())
            .unwrap()
            .with_accumulated_minutes(10_080)
            .unwrap();
        let rules: AccrualRuleSet = vec![salary(), rent().with_active(false), weekly].into_iter().collect();

        let summary = RateCalculator::summarize(&rules, t0()).unwrap();
        assert_eq!(summary.effective_rules, 2);
        assert_eq!(summary.accrued_income, dec!(70));
        assert_eq!(summary.accrued_expense, Decimal::ZERO);
        assert_eq!(summary.monthly_expense, Decimal::ZERO);
        // 9000 + 70 * (43200 / 10080)
        assert_eq!(summary.monthly_income, dec!(9000) + dec!(70) * (dec!(43200) / dec!(10080)));
    }

    #[test]
    fn test_window_sum_overflow_is_an_error() {
        let half = Decimal::MAX / dec!(2);
        let a = AccrualRule::new("A", RuleKind::Income, half, Frequency::Daily, t0()).unwrap();
        let b = AccrualRule::new("B", RuleKind::Income, half, Frequency::Daily, t0()).unwrap();
        let rules: AccrualRuleSet = vec![a, b].into_iter().collect();

        let result = RateCalculator::accrued_between(&rules, t0(), t0() + Duration::days(5));
        assert_eq!(result, Err(RuleError::AccrualOverflow));
    }
}
