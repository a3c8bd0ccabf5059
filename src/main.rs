//! accrual-ledger CLI
//!
//! Drive an accrual ledger stored in a JSON state file.
//!
//! # Usage
//!
//! ```bash
//! # Seed the ledger with the current total of all accounts
//! accrual-ledger init --amount 1000
//!
//! # Add a monthly salary
//! accrual-ledger add-rule --name Salary --kind income --amount 9000 --frequency monthly
//!
//! # Show the balance right now
//! accrual-ledger status --format json
//!
//! # Fold elapsed time into the stored baseline (what the scheduler calls)
//! accrual-ledger tick
//! ```

use accrual_ledger::prelude::*;
use accrual_ledger::interchange::export::RuleExport;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"accrual-ledger — continuous-time ledger for recurring income and expenses

USAGE:
    accrual-ledger <COMMAND> [OPTIONS]

COMMANDS:
    init          Seed (or reseed) the ledger balance
    status        Show the current balance, rates and rules
    tick          Fold elapsed time into the stored baseline
    add-rule      Add a recurring income or expense
    edit-rule     Change a rule's amount, frequency, name or kind
    toggle        Switch a rule on or off
    delete        Delete a rule
    transaction   Record a one-off income or expense
    export        Write all rules to an export document
    import        Merge rules from an export document
    wipe          Delete every rule and reset the balance to zero
    help          Show this message

COMMON OPTIONS:
    --state <FILE>      Ledger state file (default: ledger.json)
    --at <RFC3339>      Instant to act at (default: now)
    --format <FORMAT>   Output format: text (default) or json

COMMAND OPTIONS:
    init          --amount <DEC> [--reset-accumulators]
    add-rule      --name <NAME> --kind <income|expense> --amount <DEC>
                  --frequency <daily|weekly|monthly|yearly> [--from <RFC3339>] [--until <RFC3339>]
    edit-rule     --id <UUID> [--name <NAME>] [--kind <KIND>] [--amount <DEC>] [--frequency <FREQ>]
    toggle        --id <UUID>
    delete        --id <UUID>
    transaction   --kind <income|expense> --amount <DEC>
    export        [--output <FILE>]
    import        --input <FILE>

EXAMPLES:
    accrual-ledger init --amount 1000
    accrual-ledger add-rule --name Rent --kind expense --amount 3000 --frequency monthly
    accrual-ledger status --at 2024-02-01T00:00:00Z
    accrual-ledger export --output rules.json"#
    );
}

const COMMON_OPTIONS: [&str; 3] = ["--state", "--at", "--format"];
const SWITCHES: [&str; 1] = ["--reset-accumulators"];

/// Parsed `--flag value` pairs plus bare switches.
struct Options {
    values: HashMap<String, String>,
}

impl Options {
    fn parse(args: &[String], allowed: &[&str]) -> Self {
        let mut values = HashMap::new();
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            if !allowed.contains(&flag) && !COMMON_OPTIONS.contains(&flag) {
                eprintln!("Unknown option: {}", flag);
                process::exit(1);
            }
            if SWITCHES.contains(&flag) {
                values.insert(flag.to_string(), "true".to_string());
            } else {
                i += 1;
                let value = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("{} requires a value", flag);
                    process::exit(1);
                });
                values.insert(flag.to_string(), value);
            }
            i += 1;
        }
        Self { values }
    }

    fn get(&self, flag: &str) -> Option<&str> {
        self.values.get(flag).map(String::as_str)
    }

    fn require(&self, flag: &str) -> &str {
        self.get(flag).unwrap_or_else(|| {
            eprintln!("Error: {} is required", flag);
            process::exit(1);
        })
    }

    fn has(&self, flag: &str) -> bool {
        self.values.contains_key(flag)
    }

    fn json(&self) -> bool {
        self.get("--format") == Some("json")
    }

    fn state_path(&self) -> &str {
        self.get("--state").unwrap_or("ledger.json")
    }

    fn at(&self) -> DateTime<Utc> {
        self.get("--at").map(parse_instant).unwrap_or_else(Utc::now)
    }
}

fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("Error {}: {}", context, err);
    process::exit(1);
}

fn parse_instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|e| fail(&format!("parsing instant '{}'", s), e))
}

fn parse_amount(s: &str) -> Decimal {
    s.parse()
        .unwrap_or_else(|e| fail(&format!("parsing amount '{}'", s), e))
}

fn parse_id(s: &str) -> RuleId {
    s.parse::<uuid::Uuid>()
        .map(RuleId::from_uuid)
        .unwrap_or_else(|e| fail(&format!("parsing rule id '{}'", s), e))
}

fn open_engine(opts: &Options, config: LedgerConfig) -> LedgerEngine<JsonFileStore> {
    let store = JsonFileStore::open(opts.state_path())
        .unwrap_or_else(|e| fail(&format!("opening '{}'", opts.state_path()), e));
    LedgerEngine::open(store, config).unwrap_or_else(|e| fail("loading ledger", e))
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail("serializing output", e),
    }
}

/// JSON output schema for `status`.
#[derive(serde::Serialize)]
struct StatusOutput {
    seeded: bool,
    snapshot: DerivedSnapshot,
    summary: AccrualSummary,
    rules: Vec<AccrualRule>,
}

#[derive(serde::Serialize)]
struct BaselineOutput {
    timestamp: DateTime<Utc>,
    amount: String,
}

impl From<Baseline> for BaselineOutput {
    fn from(baseline: Baseline) -> Self {
        Self {
            timestamp: baseline.timestamp(),
            amount: baseline.amount().to_string(),
        }
    }
}

fn report_baseline(opts: &Options, baseline: Baseline) {
    if opts.json() {
        print_json(&BaselineOutput::from(baseline));
    } else {
        println!(
            "Baseline: {} at {}",
            baseline.amount().round_dp(2),
            baseline.timestamp().to_rfc3339()
        );
    }
}

fn print_rule(rule: &AccrualRule) {
    println!(
        "  {}  {:<20} {:<7} {:>12} {:<7} {:<8} accrued {} over {} min",
        rule.id(),
        rule.name(),
        rule.kind(),
        rule.period_amount(),
        rule.frequency(),
        if rule.is_active() { "active" } else { "paused" },
        rule.accumulated_amount().round_dp(2),
        rule.accumulated_minutes()
    );
}

fn cmd_init(args: &[String]) {
    let opts = Options::parse(args, &["--amount", "--reset-accumulators"]);
    let amount = parse_amount(opts.require("--amount"));
    let config = if opts.has("--reset-accumulators") {
        LedgerConfig::default().with_reseed_policy(ReseedPolicy::ResetAccumulators)
    } else {
        LedgerConfig::default()
    };
    let engine = open_engine(&opts, config);
    let baseline = engine
        .reseed(opts.at(), amount)
        .unwrap_or_else(|e| fail("reseeding", e));
    report_baseline(&opts, baseline);
}

fn cmd_status(args: &[String]) {
    let opts = Options::parse(args, &[]);
    let engine = open_engine(&opts, LedgerConfig::default());
    let at = opts.at();
    let snapshot = engine
        .current_value(at)
        .unwrap_or_else(|e| fail("computing current value", e));
    let summary = engine
        .summary(at)
        .unwrap_or_else(|e| fail("summarizing rules", e));
    let rules = engine.rules();

    if opts.json() {
        print_json(&StatusOutput {
            seeded: engine.is_seeded(),
            snapshot,
            summary,
            rules: rules.into_vec(),
        });
        return;
    }

    if !engine.is_seeded() {
        println!("Ledger not seeded yet; run `accrual-ledger init --amount <DEC>`.\n");
    }
    println!("{}", snapshot);
    println!("{}", summary);
    if rules.is_empty() {
        println!("No accrual rules.");
    } else {
        println!("Rules:");
        rules.iter().for_each(print_rule);
    }
}

fn cmd_tick(args: &[String]) {
    let opts = Options::parse(args, &[]);
    let engine = open_engine(&opts, LedgerConfig::default());
    let baseline = engine
        .rebase(opts.at())
        .unwrap_or_else(|e| fail("rebasing", e));
    report_baseline(&opts, baseline);
}

fn cmd_add_rule(args: &[String]) {
    let opts = Options::parse(
        args,
        &["--name", "--kind", "--amount", "--frequency", "--from", "--until"],
    );
    let at = opts.at();
    let kind: RuleKind = opts
        .require("--kind")
        .parse()
        .unwrap_or_else(|e| fail("parsing kind", e));
    let frequency: Frequency = opts
        .require("--frequency")
        .parse()
        .unwrap_or_else(|e| fail("parsing frequency", e));
    let from = opts.get("--from").map(parse_instant).unwrap_or(at);

    let mut rule = AccrualRule::new(
        opts.require("--name"),
        kind,
        parse_amount(opts.require("--amount")),
        frequency,
        from,
    )
    .unwrap_or_else(|e| fail("creating rule", e));
    if let Some(until) = opts.get("--until") {
        rule = rule
            .with_effective_until(parse_instant(until))
            .unwrap_or_else(|e| fail("creating rule", e));
    }

    let engine = open_engine(&opts, LedgerConfig::default());
    let id = engine
        .add_rule(rule, at)
        .unwrap_or_else(|e| fail("adding rule", e));
    if opts.json() {
        print_json(&engine.rule(id));
    } else {
        println!("Added rule {}", id);
    }
}

fn cmd_edit_rule(args: &[String]) {
    let opts = Options::parse(args, &["--id", "--name", "--kind", "--amount", "--frequency"]);
    let id = parse_id(opts.require("--id"));
    let edit = RuleEdit {
        name: opts.get("--name").map(str::to_string),
        kind: opts
            .get("--kind")
            .map(|k| k.parse().unwrap_or_else(|e| fail("parsing kind", e))),
        period_amount: opts.get("--amount").map(parse_amount),
        frequency: opts
            .get("--frequency")
            .map(|f| f.parse().unwrap_or_else(|e| fail("parsing frequency", e))),
        ..Default::default()
    };

    let engine = open_engine(&opts, LedgerConfig::default());
    let rule = engine
        .edit_rule(id, &edit, opts.at())
        .unwrap_or_else(|e| fail("editing rule", e));
    if opts.json() {
        print_json(&rule);
    } else {
        print_rule(&rule);
    }
}

fn cmd_toggle(args: &[String]) {
    let opts = Options::parse(args, &["--id"]);
    let id = parse_id(opts.require("--id"));
    let engine = open_engine(&opts, LedgerConfig::default());
    let active = engine
        .toggle_active(id, opts.at())
        .unwrap_or_else(|e| fail("toggling rule", e));
    println!("Rule {} is now {}", id, if active { "active" } else { "paused" });
}

fn cmd_delete(args: &[String]) {
    let opts = Options::parse(args, &["--id"]);
    let id = parse_id(opts.require("--id"));
    let engine = open_engine(&opts, LedgerConfig::default());
    let removed = engine
        .delete_rule(id, opts.at())
        .unwrap_or_else(|e| fail("deleting rule", e));
    println!("Deleted rule {} '{}'", id, removed.name());
}

fn cmd_transaction(args: &[String]) {
    let opts = Options::parse(args, &["--kind", "--amount"]);
    let kind = match opts.require("--kind").to_ascii_lowercase().as_str() {
        "income" => TransactionKind::Income,
        "expense" => TransactionKind::Expense,
        other => fail("parsing kind", format!("unknown transaction kind '{}'", other)),
    };
    let amount = parse_amount(opts.require("--amount"));
    let engine = open_engine(&opts, LedgerConfig::default());
    let baseline = engine
        .record_transaction(kind, amount, opts.at())
        .unwrap_or_else(|e| fail("recording transaction", e));
    report_baseline(&opts, baseline);
}

fn cmd_export(args: &[String]) {
    let opts = Options::parse(args, &["--output"]);
    let engine = open_engine(&opts, LedgerConfig::default());
    let export = RuleExport::new(opts.at(), engine.rules().into_vec());
    let json = export
        .to_json()
        .unwrap_or_else(|e| fail("serializing export", e));

    if let Some(path) = opts.get("--output") {
        fs::write(path, &json).unwrap_or_else(|e| fail(&format!("writing to '{}'", path), e));
        eprintln!("Exported {} rules → {}", export.rules.len(), path);
    } else {
        println!("{}", json);
    }
}

fn cmd_import(args: &[String]) {
    let opts = Options::parse(args, &["--input"]);
    let path = opts.require("--input");
    let content =
        fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("reading '{}'", path), e));
    let export = RuleExport::from_json(&content).unwrap_or_else(|e| fail("parsing export", e));

    let engine = open_engine(&opts, LedgerConfig::default());
    let report = engine
        .import_rules(export.rules, opts.at())
        .unwrap_or_else(|e| fail("importing rules", e));
    if opts.json() {
        print_json(&report);
    } else {
        println!(
            "Imported {} rules: {} merged into existing rules, {} added",
            report.total(),
            report.merged.len(),
            report.inserted.len()
        );
    }
}

fn cmd_wipe(args: &[String]) {
    let opts = Options::parse(args, &[]);
    let engine = open_engine(&opts, LedgerConfig::default());
    let baseline = engine
        .wipe(opts.at())
        .unwrap_or_else(|e| fail("wiping ledger", e));
    report_baseline(&opts, baseline);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "init" => cmd_init(rest),
        "status" => cmd_status(rest),
        "tick" => cmd_tick(rest),
        "add-rule" => cmd_add_rule(rest),
        "edit-rule" => cmd_edit_rule(rest),
        "toggle" => cmd_toggle(rest),
        "delete" => cmd_delete(rest),
        "transaction" => cmd_transaction(rest),
        "export" => cmd_export(rest),
        "import" => cmd_import(rest),
        "wipe" => cmd_wipe(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
