use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How often an accrual rule pays out its period amount.
///
/// Each frequency maps to a fixed number of minutes per cycle. Monthly is a
/// flat 30-day cycle, not a calendar month.
///
/// # Examples
///
/// ```
/// use accrual_ledger::core::frequency::Frequency;
///
/// assert_eq!(Frequency::Daily.minutes_per_cycle(), 1_440);
/// assert_eq!(Frequency::Monthly.minutes_per_cycle(), 43_200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

pub const MINUTES_PER_DAY: u64 = 1_440;
pub const MINUTES_PER_WEEK: u64 = 7 * MINUTES_PER_DAY;
pub const MINUTES_PER_MONTH: u64 = 30 * MINUTES_PER_DAY;
pub const MINUTES_PER_YEAR: u64 = 365 * MINUTES_PER_DAY;

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// Length of one cycle in minutes.
    pub fn minutes_per_cycle(&self) -> u64 {
        match self {
            Frequency::Daily => MINUTES_PER_DAY,
            Frequency::Weekly => MINUTES_PER_WEEK,
            Frequency::Monthly => MINUTES_PER_MONTH,
            Frequency::Yearly => MINUTES_PER_YEAR,
        }
    }

    /// How many cycles of this frequency fit in one (30-day) month.
    ///
    /// Used to express a rule's amount as a monthly equivalent.
    pub fn cycles_per_month(&self) -> Decimal {
        Decimal::from(MINUTES_PER_MONTH) / Decimal::from(self.minutes_per_cycle())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown frequency '{0}', expected one of daily, weekly, monthly, yearly")]
pub struct ParseFrequencyError(String);

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}
