//! A month of salary and rent, with a rent change halfway through.
//!
//! Shows how the ledger folds elapsed time into its baseline before every
//! change, so the new rent only applies from the moment it was edited.

use accrual_ledger::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() {
    println!("╔═══════════════════════════════════════════════╗");
    println!("║  accrual-ledger: Salary and Rent Example      ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let engine = LedgerEngine::open(MemoryStore::new(), LedgerConfig::default()).unwrap();
    engine.reseed(t0, dec!(1000)).unwrap();

    let salary = AccrualRule::new("Salary", RuleKind::Income, dec!(9000), Frequency::Monthly, t0).unwrap();
    let rent = AccrualRule::new("Rent", RuleKind::Expense, dec!(3000), Frequency::Monthly, t0).unwrap();
    engine.add_rule(salary, t0).unwrap();
    let rent_id = engine.add_rule(rent, t0).unwrap();

    // --- Scenario 1: half a month passes ---
    println!("━━━ Day 15 ━━━\n");
    let mid = t0 + Duration::days(15);
    println!("{}", engine.current_value(mid).unwrap());

    // --- Scenario 2: rent goes up, effective now ---
    println!("━━━ Rent rises to 3600 on day 15 ━━━\n");
    engine.edit_rule(rent_id, &RuleEdit::amount(dec!(3600)), mid).unwrap();
    let baseline = engine.baseline().unwrap();
    println!("Baseline folded to {} at {}\n", baseline.amount(), baseline.timestamp());

    // --- Scenario 3: end of the month ---
    println!("━━━ Day 30 ━━━\n");
    let end = t0 + Duration::days(30);
    println!("{}", engine.current_value(end).unwrap());
    println!("{}", engine.summary(end).unwrap());

    // 1000 + 9000 - 1500 - 1800
    println!("Expected balance: {}", dec!(6700));
}
