//! zc-report: headless batch runner for the ZenoCoin loyalty analysis.
//!
//! Usage:
//!   zc-report analyze --input data.csv --target-rate 0.4
//!   zc-report analyze --synthetic 500 --seed 42 --json
//!   zc-report generate --customers 500 --seed 42 --output data.csv

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use zc_analytics_core::{
    config::{AnalysisConfig, ParsePolicy},
    data_loader::write_transactions,
    roi_calculator::RoiOutcome,
    synthetic::{self, SyntheticConfig},
    AnalysisPipeline, AnalysisReport,
};

/// ZenoCoin loyalty analytics over a transaction CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis and print a summary or the JSON report
    Analyze(AnalyzeArgs),
    /// Write a synthetic transaction table as CSV
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Transaction CSV to analyze
    #[arg(short, long, conflicts_with = "synthetic", required_unless_present = "synthetic")]
    input: Option<String>,

    /// Analyze a generated table of this many customers instead
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for --synthetic
    #[arg(long, default_value = "42")]
    seed: u64,

    /// JSON configuration file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Target adoption rate for the ROI scenario, in [0, 1]
    #[arg(short, long)]
    target_rate: Option<f64>,

    /// Drop unparseable rows instead of aborting
    #[arg(long)]
    skip_bad_rows: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "500")]
    customers: usize,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output CSV path; stdout when omitted
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Analyze(args) => analyze(args),
        Command::Generate(args) => generate(args),
    }
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(rate) = args.target_rate {
        config.roi.target_adoption_rate = rate;
    }
    if args.skip_bad_rows {
        config.loader.parse_policy = ParsePolicy::Skip;
    }

    let pipeline = AnalysisPipeline::new(config);
    let report = match (&args.input, args.synthetic) {
        (Some(path), _) => pipeline
            .run_file(path)
            .with_context(|| format!("analysis of {path} failed"))?,
        (None, Some(customers)) => {
            let transactions = synthetic::generate(&SyntheticConfig::with_customers(customers), args.seed);
            pipeline.run(&transactions)?
        }
        (None, None) => anyhow::bail!("either --input or --synthetic is required"),
    };

    if args.json {
        let stdout = io::stdout();
        report.write_json(stdout.lock())?;
        println!();
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
    let transactions = synthetic::generate(&SyntheticConfig::with_customers(args.customers), args.seed);
    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path).with_context(|| format!("Cannot create {path}"))?;
            write_transactions(file, &transactions)?;
            log::info!("wrote {} transactions to {path}", transactions.len());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_transactions(&mut handle, &transactions)?;
            handle.flush()?;
        }
    }
    Ok(())
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:+.1}%", v * 100.0))
}

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
}

fn print_summary(report: &AnalysisReport) {
    let d = &report.dataset;
    println!("=== RUN SUMMARY ===");
    println!("  run_id:        {}", report.run_id);
    println!("  rows read:     {}", d.rows_read);
    println!("  filtered:      {}", d.rows_filtered);
    println!("  skipped:       {}", d.rows_skipped);
    println!("  transactions:  {}", d.transaction_count);
    println!("  customers:     {}", d.customer_count);
    println!("  ZC users:      {}", d.zc_user_count);
    if let (Some(first), Some(as_of)) = (d.earliest_bill_date, d.as_of) {
        println!("  period:        {first} .. {as_of}");
    }

    println!();
    println!("=== SEGMENTS ===");
    for s in &report.segmentation.summary {
        println!(
            "  {:<11} {:>6} ({:>5.1}%) | avg spend {:>9.2} | avg orders {:>5.2} | ZC {:>5.1}%",
            s.segment.label(),
            s.customer_count,
            s.share * 100.0,
            s.avg_spend,
            s.avg_orders,
            s.zc_user_share * 100.0
        );
    }

    println!();
    println!("=== COHORTS ===");
    let c = &report.cohorts;
    for m in [&c.zc_acquired, &c.non_zc_acquired] {
        let retention: Vec<String> = m
            .retention
            .iter()
            .map(|r| format!("{}d {}", r.horizon_days, rate(r.rate)))
            .collect();
        println!(
            "  {:<15} {:>6} customers | avg spend {:>9.2} | retention {}",
            m.cohort.label(),
            m.customer_count,
            m.avg_total_spend,
            retention.join(", ")
        );
    }
    println!("  spend lift:    {}", pct(c.comparison.spend_lift));
    println!("  LTV lift:      {}", pct(c.comparison.ltv_lift));
    if let Some(test) = &c.comparison.monthly_spend_test {
        println!(
            "  Welch t:       {:.2} (df {:.1}){}",
            test.t_statistic,
            test.degrees_of_freedom,
            if test.significant { " significant" } else { "" }
        );
    }

    println!();
    println!("=== ADOPTION ===");
    let a = &report.adoption.summary;
    println!("  adopters:      {}", a.adopter_count);
    println!(
        "  spend / 30d:   {:.2} -> {:.2} ({})",
        a.avg_before_spend_rate.unwrap_or(0.0),
        a.avg_after_spend_rate.unwrap_or(0.0),
        pct(a.spend_rate_lift)
    );
    println!("  retention:     {}", rate(a.retention.rate));

    println!();
    println!("=== MONTHLY ===");
    let mo = &report.monthly;
    println!("  redemption:    {}", rate(mo.redemption.rate));
    println!("  next month:    {}", rate(mo.next_month_retention.rate));
    println!("  investment:    {:.2}", mo.historical_roi.total_investment);
    println!(
        "  ROI (monthly): {}",
        mo.historical_roi.monthly_roi.map_or("n/a".to_string(), |r| format!("{r:.1}%"))
    );

    println!();
    println!("=== ROI PROJECTION ===");
    match &report.roi {
        RoiOutcome::Projected(p) => {
            println!(
                "  target {:.0}% -> effective {:.1}% ({})",
                p.target_adoption_rate * 100.0,
                p.effective_adoption_rate * 100.0,
                p.projection_model
            );
            println!("  incremental users:   {:.0}", p.incremental_users);
            println!("  incremental revenue: {:.2}/month", p.point_estimate);
            println!(
                "  {:.0}% interval:        [{:.2}, {:.2}]",
                p.confidence_interval.level * 100.0,
                p.confidence_interval.lower,
                p.confidence_interval.upper
            );
            println!("  net monthly impact:  {:.2}", p.net_monthly_impact);
            println!("  annual impact:       {:.2}", p.annual_impact);
            println!("  risk-adjusted:       {:.2} (risk {:.1}%)", p.risk_adjusted_annual_impact, p.risk_score);
        }
        RoiOutcome::InsufficientData { metric, size, minimum } => {
            println!("  skipped: '{metric}' has {size} samples, {minimum} required");
        }
    }
}
