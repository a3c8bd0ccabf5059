use accrual_ledger::accrual::rate::RateCalculator;
use accrual_ledger::prelude::*;
use accrual_ledger::simulation::rule_generator::{generate_random_rules, RuleSetConfig};
use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

fn engine_with_rules(rule_count: usize) -> LedgerEngine<MemoryStore> {
    let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let config = RuleSetConfig {
        rule_count,
        ..Default::default()
    };
    let rules = generate_random_rules(&config, origin);
    let store = MemoryStore::with_state(Some(Baseline::new(origin, Decimal::ZERO)), rules.into_vec());
    LedgerEngine::open(store, LedgerConfig::default()).unwrap()
}

fn bench_rebase_20_rules(c: &mut Criterion) {
    let engine = engine_with_rules(20);
    let origin = engine.baseline().unwrap().timestamp();
    let mut minute = 0;

    c.bench_function("rebase_20_rules", |b| {
        b.iter(|| {
            minute += 1;
            engine.rebase(black_box(origin + Duration::minutes(minute))).unwrap()
        })
    });
}

fn bench_current_value_200_rules(c: &mut Criterion) {
    let engine = engine_with_rules(200);
    let now = engine.baseline().unwrap().timestamp() + Duration::days(45);

    c.bench_function("current_value_200_rules", |b| {
        b.iter(|| engine.current_value(black_box(now)).unwrap())
    });
}

fn bench_net_rate_1000_rules(c: &mut Criterion) {
    let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let config = RuleSetConfig {
        rule_count: 1000,
        ..Default::default()
    };
    let rules = generate_random_rules(&config, origin);
    let at = origin + Duration::days(30);

    c.bench_function("net_rate_1000_rules", |b| {
        b.iter(|| RateCalculator::net_rate(black_box(&rules), at).unwrap())
    });
}

criterion_group!(
    benches,
    bench_rebase_20_rules,
    bench_current_value_200_rules,
    bench_net_rate_1000_rules
);
criterion_main!(benches);
