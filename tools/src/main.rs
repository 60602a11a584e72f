//! seed-runner: populate a billing database with synthetic data.
//!
//! Usage:
//!   seed-runner --db billing.db --customers 200000 --purchases 200000 --payments 200000
//!   seed-runner --config data/population.json --strategy insert --workers 8
//!   seed-runner --db billing.db --clear-only
//!   seed-runner --db billing.db --report

use anyhow::{Context, Result};
use billing_seed_core::{
    config::PopulationConfig,
    loader::LoadStrategy,
    pipeline::{Pipeline, PopulationReport},
    store::Store,
};
use std::env;
use std::str::FromStr;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = build_config(&args)?;
    let clear_only = args.iter().any(|a| a == "--clear-only");
    let report_json = args.iter().any(|a| a == "--report");
    log::debug!("effective config: {config:?}");

    println!("billing-seed - seed-runner");
    println!("  db:         {}", config.store.path);
    println!("  customers:  {}", config.targets.customers);
    println!("  purchases:  {}", config.targets.purchases);
    println!("  payments:   {}", config.targets.payments);
    println!("  batch size: {}", config.batch_size);
    println!("  strategy:   {:?}", config.load_strategy);
    println!("  seed:       {}", config.seed);
    println!();

    let mut pipeline = Pipeline::new(config)?;

    if clear_only {
        pipeline.clear()?;
        let counts = pipeline.store().table_counts()?;
        println!("Cleared {} (run {}).", pipeline.store().path(), pipeline.run_id);
        println!(
            "  customers: {}  services: {}  purchases: {}  payments: {}",
            counts.customers, counts.services, counts.purchases, counts.payments
        );
        return Ok(());
    }

    let report = pipeline
        .run()
        .with_context(|| format!("population run {} failed", pipeline.run_id))?;

    print_summary(&report);
    print_dashboard(pipeline.store())?;

    if report_json {
        println!();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Config file first (if given), then individual flag overrides.
fn build_config(args: &[String]) -> Result<PopulationConfig> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => PopulationConfig::load(path)?,
        None => PopulationConfig::default(),
    };

    if let Some(db) = flag_value(args, "--db") {
        config.store.path = db.to_string();
    }
    let t = &mut config.targets;
    t.customers = parse_arg(args, "--customers", t.customers)?;
    t.purchases = parse_arg(args, "--purchases", t.purchases)?;
    t.payments = parse_arg(args, "--payments", t.payments)?;
    config.batch_size = parse_arg(args, "--batch-size", config.batch_size)?;
    config.workers = parse_arg(args, "--workers", config.workers)?;
    config.seed = parse_arg(args, "--seed", config.seed)?;
    config.load_strategy = parse_arg::<LoadStrategy>(args, "--strategy", config.load_strategy)?;

    config.validate()?;
    Ok(config)
}

fn print_summary(report: &PopulationReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:   {}", report.run_id);
    println!("  workers:  {}", report.workers);
    println!("  elapsed:  {:.2}s", report.elapsed_secs);
    for stage in &report.stages {
        let rate = if stage.elapsed_secs > 0.0 {
            stage.rows as f64 / stage.elapsed_secs
        } else {
            0.0
        };
        println!(
            "  {:<10} {:>9} rows  {:>4} chunks  {:>7.2}s  ({rate:.0} rows/s)",
            stage.stage, stage.rows, stage.chunks, stage.elapsed_secs
        );
    }

    let Some(v) = &report.verification else {
        return;
    };
    println!();
    println!("=== VERIFICATION ===");
    println!(
        "  customers: {}  services: {}  purchases: {}  payments: {}",
        v.counts.customers, v.counts.services, v.counts.purchases, v.counts.payments
    );
    println!("  service popularity:");
    for s in &v.popularity {
        println!("    {:<28} {:>8} ({:.1}%)", s.name, s.purchases, s.share * 100.0);
    }
    println!(
        "  payment amounts correct: {}/{}",
        v.payments.correct_amounts, v.payments.sampled
    );
    println!(
        "  same-customer payments:  {}/{} ({:.1}%)",
        v.payments.matching_customers,
        v.payments.sampled,
        v.same_customer_share() * 100.0
    );
    println!(
        "  purchase term violations: {}/{}",
        v.terms.violations, v.terms.sampled
    );
}

fn print_dashboard(store: &Store) -> Result<()> {
    println!();
    println!("=== PAYMENTS BY SERVICE TYPE ===");
    for s in store.service_type_stats()? {
        println!(
            "  {:<8} {:>8} payments  total {:>12.2}  avg {:>7.2}  completed {:>7}",
            s.service_type.label(),
            s.total_payments,
            s.total_amount,
            s.avg_amount,
            s.successful_payments
        );
    }

    println!();
    println!("=== TOP CUSTOMERS ===");
    for c in store.top_customers(5)? {
        println!(
            "  #{:<8} {:<28} {:>10.2} over {} payments",
            c.customer_id, c.name, c.total_spent, c.payment_count
        );
    }

    println!();
    println!("=== RECENT PAYMENTS ===");
    for p in store.recent_payments(10)? {
        println!(
            "  {} {:<24} {:<28} {:>8.2} {} {}",
            p.timestamp.format("%Y-%m-%d %H:%M"),
            p.customer_name,
            p.service_name,
            p.amount,
            p.currency.label(),
            p.status.label()
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Parse `flag`'s value, or keep `default` when the flag is absent.
/// A present but malformed value is an error rather than silently ignored.
fn parse_arg<T>(args: &[String], flag: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value '{raw}' for {flag}: {e}")),
        None => Ok(default),
    }
}
