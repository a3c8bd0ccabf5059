use crate::core::time::truncate_to_minute;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The last exact ledger value and the minute it was true.
///
/// Only the ledger engine moves a baseline forward; its timestamp never
/// goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    timestamp: DateTime<Utc>,
    amount: Decimal,
}

impl Baseline {
    pub fn new(timestamp: DateTime<Utc>, amount: Decimal) -> Self {
        Self {
            timestamp: truncate_to_minute(timestamp),
            amount,
        }
    }

    pub fn zero(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, Decimal::ZERO)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The baseline moved to `timestamp` with `delta` folded in, or `None`
    /// if the amount leaves the decimal range.
    pub(crate) fn advanced(&self, timestamp: DateTime<Utc>, delta: Decimal) -> Option<Self> {
        let amount = self.amount.checked_add(delta)?;
        Some(Self::new(timestamp.max(self.timestamp), amount))
    }

    pub(crate) fn shifted(&self, delta: Decimal) -> Option<Self> {
        let amount = self.amount.checked_add(delta)?;
        Some(Self {
            timestamp: self.timestamp,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    #[test]
    fn test_baseline_is_minute_truncated() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 42).unwrap();
        let baseline = Baseline::new(at, dec!(10));
        assert_eq!(baseline.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 0).unwrap());
    }

    #[test]
    fn test_advanced_never_regresses() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let baseline = Baseline::new(at, dec!(10));
        let moved = baseline.advanced(at - Duration::minutes(5), dec!(1)).unwrap();
        assert_eq!(moved.timestamp(), at);
        assert_eq!(moved.amount(), dec!(11));
    }

    #[test]
    fn test_amount_overflow_is_none() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let baseline = Baseline::new(at, Decimal::MAX);
        assert_eq!(baseline.advanced(at, dec!(1)), None);
        assert_eq!(baseline.shifted(dec!(1)), None);
        assert_eq!(baseline.shifted(dec!(-1)).unwrap().amount(), Decimal::MAX - dec!(1));
    }
}
