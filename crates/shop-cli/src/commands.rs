use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use shop_ledger::{AuditReport, EventRecord, ShopConfig, ShopReader};
use shop_types::{ItemDraft, ItemId, Principal};

use crate::cli::*;
use crate::script::{Outcome, Script, Session, Step};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format),
        Command::Demo => cmd_demo(cli.format),
        Command::Audit(args) => cmd_audit(args, cli.format),
    }
}

fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (session, script) = prepare(&args)?;
    let outcomes = execute(&session, &script.steps, format);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }
    Ok(())
}

fn cmd_audit(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (session, script) = prepare(&args)?;
    for step in &script.steps {
        if let Outcome::Rejected { step, kind, message } = session.execute(step) {
            tracing::info!(step, kind, %message, "step rejected");
        }
    }
    let events = session.shop.events()?;
    let report = session.shop.audit()?;

    match format {
        OutputFormat::Json => {
            let out = AuditOutput {
                events: &events,
                summary: AuditSummary::from(&report),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            for record in &events {
                print_event(record);
            }
            println!();
            print_report(&report);
        }
    }
    Ok(())
}

/// Scenarios A to D: exact payment, selling out, overpayment and an
/// unauthorized create.
fn cmd_demo(format: OutputFormat) -> anyhow::Result<()> {
    let knife = ItemDraft::new(
        "Hunting knife",
        "Sharp knife for hunting",
        "https://example.com/hunting-knife.jpg",
        100,
        10,
    );
    let create = Step::Create {
        caller: "owner".into(),
        item: knife,
    };
    let buy = |quantity, attach| Step::Purchase {
        caller: "buyer".into(),
        id: ItemId::new(1),
        quantity,
        attach,
    };
    let fund = |amount| Step::Fund {
        who: "buyer".into(),
        amount,
    };
    let record = Step::Record {
        who: "buyer".into(),
        id: ItemId::new(1),
    };

    let scenarios = vec![
        (
            "exact payment",
            vec![create.clone(), fund(200), buy(2, 200), record.clone()],
        ),
        (
            "sell out, then reject",
            vec![create.clone(), fund(1100), buy(10, 1000), buy(1, 100)],
        ),
        (
            "overpayment is refunded",
            vec![create.clone(), fund(250), buy(2, 250), record],
        ),
        (
            "only the proprietor creates items",
            vec![
                Step::Create {
                    caller: "mallory".into(),
                    item: ItemDraft::new("Fake", "Fake", "ipfs://fake", 1, 1),
                },
                Step::List,
            ],
        ),
    ];

    let mut report = Vec::new();
    for (name, steps) in scenarios {
        let session = Session::new(ShopConfig::new(Principal::from_label("owner")))?;
        if format == OutputFormat::Text {
            println!("{} {}", "==".dimmed(), name.bold());
        }
        let outcomes = execute(&session, &steps, format);
        if format == OutputFormat::Text {
            let buyer = Principal::from_label("buyer");
            println!(
                "  wallets: owner {}, buyer {}\n",
                session.bank.balance(&Principal::from_label("owner")),
                session.bank.balance(&buyer),
            );
        }
        report.push(DemoScenario { name, outcomes });
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn prepare(args: &RunArgs) -> anyhow::Result<(Session, Script)> {
    let config = match &args.config {
        Some(path) => ShopConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ShopConfig::new(crate::script::resolve_principal(&args.owner)),
    };
    let script = load_script(&args.script)?;
    tracing::debug!(
        steps = script.steps.len(),
        proprietor = %config.proprietor,
        "script loaded"
    );
    let session = Session::new(config)?;
    Ok((session, script))
}

fn load_script(path: &Path) -> anyhow::Result<Script> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
}

/// Run every step; failures are reported and the script carries on.
fn execute(session: &Session, steps: &[Step], format: OutputFormat) -> Vec<Outcome> {
    steps
        .iter()
        .map(|step| {
            let outcome = session.execute(step);
            if format == OutputFormat::Text {
                print_outcome(&outcome);
            }
            outcome
        })
        .collect()
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Created { id } => {
            println!("{} Created item {}", "✓".green().bold(), id.to_string().yellow())
        }
        Outcome::Updated { id } => {
            println!("{} Updated item {}", "✓".green().bold(), id.to_string().yellow())
        }
        Outcome::Funded { who, balance } => {
            println!("{} Funded {} (balance {})", "✓".green(), who.short_id().cyan(), balance)
        }
        Outcome::Purchased { receipt } => {
            println!(
                "{} {} bought {} x {} for {}",
                "✓".green().bold(),
                receipt.buyer.short_id().cyan(),
                receipt.quantity,
                receipt.item_id.to_string().yellow(),
                receipt.total_price.to_string().bold(),
            );
            if receipt.refund > 0 {
                println!("  Refund: {}", receipt.refund);
            }
            println!(
                "  Receipt: {}  event #{}",
                receipt.receipt_id.short_id().dimmed(),
                receipt.event_seq
            );
        }
        Outcome::Item { item } => print_item(item),
        Outcome::Record { who, id, quantity } => {
            println!(
                "{} holds {} of {}",
                who.short_id().cyan(),
                quantity.to_string().bold(),
                id.to_string().yellow()
            )
        }
        Outcome::Items { items } => {
            if items.is_empty() {
                println!("Catalog is empty.");
            }
            for item in items {
                print_item(item);
            }
        }
        Outcome::Rejected { step, kind, message } => {
            println!("{} {} rejected [{}]: {}", "✗".red().bold(), step, kind.red(), message)
        }
    }
}

fn print_item(item: &shop_types::Item) {
    let status = if item.available {
        "available".green()
    } else {
        "withdrawn".red()
    };
    println!(
        "{}  {}  price {}  stock {}  ({})",
        item.id.to_string().yellow().bold(),
        item.name.bold(),
        item.price,
        item.stock,
        status,
    );
}

fn print_event(record: &EventRecord) {
    println!(
        "{}  {}  {}",
        format!("e#{}", record.seq).yellow(),
        record.short_hash().dimmed(),
        record.event,
    );
}

fn print_report(report: &AuditReport) {
    let check = |ok: bool, good: &str, bad: &str| {
        if ok {
            good.green()
        } else {
            bad.red()
        }
    };
    let v = &report.validation;
    if report.is_clean() {
        println!("{} Event log verified", "✓".green().bold());
    } else {
        println!("{} Event log needs attention", "✗".red().bold());
    }
    println!("  Records: {}", v.record_count);
    println!("  Hash chain: {}", check(v.hash_chain_valid, "valid", "broken"));
    println!("  Sequences: {}", check(v.sequence_monotonic, "monotonic", "gapped"));
    println!("  Items: {}", check(v.items_attributed, "attributed", "unknown references"));
    println!("  Replay: {}", check(report.replay_matches, "matches live state", "diverges"));
    println!(
        "  Settlements: {}",
        check(report.unsettled.is_empty(), "complete", "failed transfers pending")
    );
    for violation in &v.violations {
        println!("  {} e#{}: {}", "!".red(), violation.seq, violation.description);
    }
    for record in &report.unsettled {
        println!("  {} e#{}: {}", "!".red(), record.seq, record.event);
    }
}

#[derive(Serialize)]
struct DemoScenario {
    name: &'static str,
    outcomes: Vec<Outcome>,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    events: &'a [EventRecord],
    summary: AuditSummary,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct AuditSummary {
    clean: bool,
    records: u64,
    hash_chain_valid: bool,
    sequence_monotonic: bool,
    items_attributed: bool,
    replay_matches: bool,
    unsettled: Vec<u64>,
    violations: Vec<String>,
}

impl From<&AuditReport> for AuditSummary {
    fn from(report: &AuditReport) -> Self {
        let v = &report.validation;
        Self {
            clean: report.is_clean(),
            records: v.record_count,
            hash_chain_valid: v.hash_chain_valid,
            sequence_monotonic: v.sequence_monotonic,
            items_attributed: v.items_attributed,
            replay_matches: report.replay_matches,
            unsettled: report.unsettled.iter().map(|r| r.seq).collect(),
            violations: v
                .violations
                .iter()
                .map(|x| format!("e#{}: {}", x.seq, x.description))
                .collect(),
        }
    }
}
