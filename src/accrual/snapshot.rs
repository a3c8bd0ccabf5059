use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the ledger for presentation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSnapshot {
    pub amount: Decimal,
    pub income_rate_per_minute: Decimal,
    pub expense_rate_per_minute: Decimal,
    pub net_rate_per_minute: Decimal,
    pub as_of: DateTime<Utc>,
}

impl DerivedSnapshot {
    /// The snapshot reported before the ledger has ever been seeded.
    pub fn zero(as_of: DateTime<Utc>) -> Self {
        Self {
            amount: Decimal::ZERO,
            income_rate_per_minute: Decimal::ZERO,
            expense_rate_per_minute: Decimal::ZERO,
            net_rate_per_minute: Decimal::ZERO,
            as_of,
        }
    }

    pub fn net_rate_per_day(&self) -> Decimal {
        self.net_rate_per_minute * Decimal::from(crate::core::frequency::MINUTES_PER_DAY)
    }
}

impl std::fmt::Display for DerivedSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Ledger Snapshot ===")?;
        writeln!(f, "As of:          {}", self.as_of.to_rfc3339())?;
        writeln!(f, "Amount:         {}", self.amount.round_dp(2))?;
        writeln!(f, "Income/min:     {}", self.income_rate_per_minute.round_dp(6))?;
        writeln!(f, "Expense/min:    {}", self.expense_rate_per_minute.round_dp(6))?;
        writeln!(f, "Net/min:        {}", self.net_rate_per_minute.round_dp(6))?;
        writeln!(f, "Net/day:        {}", self.net_rate_per_day().round_dp(2))
    }
}

/// Aggregates over the rule set used by summary screens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualSummary {
    /// Everything income rules have accrued so far.
    pub accrued_income: Decimal,
    /// Everything expense rules have accrued so far.
    pub accrued_expense: Decimal,
    /// Monthly equivalent of the income rules currently in effect.
    pub monthly_income: Decimal,
    /// Monthly equivalent of the expense rules currently in effect.
    pub monthly_expense: Decimal,
    pub effective_rules: usize,
}

impl AccrualSummary {
    pub fn monthly_net(&self) -> Decimal {
        self.monthly_income - self.monthly_expense
    }
}

impl std::fmt::Display for AccrualSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Accrual Summary ===")?;
        writeln!(f, "Accrued income:  {}", self.accrued_income.round_dp(2))?;
        writeln!(f, "Accrued expense: {}", self.accrued_expense.round_dp(2))?;
        writeln!(f, "Monthly income:  {}", self.monthly_income.round_dp(2))?;
        writeln!(f, "Monthly expense: {}", self.monthly_expense.round_dp(2))?;
        writeln!(f, "Monthly net:     {}", self.monthly_net().round_dp(2))?;
        writeln!(f, "Effective rules: {}", self.effective_rules)
    }
}
