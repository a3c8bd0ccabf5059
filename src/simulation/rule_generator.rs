//! Random rule-set generation for stress tests and benchmarks.

use crate::core::frequency::Frequency;
use crate::core::rule::{AccrualRule, RuleKind};
use crate::core::rule_set::AccrualRuleSet;
use crate::core::time::plus_minutes;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;

/// Configuration for generating a random rule set.
#[derive(Debug, Clone)]
pub struct RuleSetConfig {
    pub rule_count: usize,
    /// Probability that a generated rule is income rather than expense.
    pub income_probability: f64,
    /// Probability that a generated rule has an end date.
    pub end_date_probability: f64,
    /// Probability that a generated rule is switched off.
    pub inactive_probability: f64,
    /// Rules start somewhere in `[origin, origin + start_spread_minutes)`.
    pub start_spread_minutes: i64,
    /// Smallest period amount, in whole cents.
    pub min_amount_cents: i64,
    /// Largest period amount, in whole cents.
    pub max_amount_cents: i64,
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        Self {
            rule_count: 20,
            income_probability: 0.3,
            end_date_probability: 0.2,
            inactive_probability: 0.1,
            start_spread_minutes: 43_200,
            min_amount_cents: 100,
            max_amount_cents: 1_000_000,
        }
    }
}

/// Generate random rules starting around `origin`.
pub fn generate_random_rules(config: &RuleSetConfig, origin: DateTime<Utc>) -> AccrualRuleSet {
    let mut rng = rand::thread_rng();
    let mut set = AccrualRuleSet::new();

    for i in 0..config.rule_count {
        let kind = if rng.gen_bool(config.income_probability) {
            RuleKind::Income
        } else {
            RuleKind::Expense
        };
        let frequency = Frequency::ALL[rng.gen_range(0..Frequency::ALL.len())];
        let cents = rng.gen_range(config.min_amount_cents.max(1)..=config.max_amount_cents.max(1));
        let amount = Decimal::new(cents, 2);
        let start = plus_minutes(origin, rng.gen_range(0..config.start_spread_minutes.max(1)));

        let Ok(mut rule) = AccrualRule::new(format!("RULE-{:03}", i), kind, amount, frequency, start) else {
            continue;
        };
        if rng.gen_bool(config.end_date_probability) {
            let length = rng.gen_range(1..=frequency.minutes_per_cycle() as i64 * 3);
            if let Ok(bounded) = rule.clone().with_effective_until(plus_minutes(start, length)) {
                rule = bounded;
            }
        }
        if rng.gen_bool(config.inactive_probability) {
            rule = rule.with_active(false);
        }
        set.upsert(rule);
    }

    set
}
