//! Financing Simulator CLI
//!
//! Compares a loan request across lenders, exports a single lender's schedule, and lists
//! the configured lenders.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

use financing_simulator::lender::DEFAULT_LENDER_DATA_PATH;
use financing_simulator::schedule::export_schedule_csv;
use financing_simulator::{rank_by_cost, ComparisonAggregator, LenderCatalog, LoanRequest, SimulationConfig};

/// Mortgage financing simulator
#[derive(Parser)]
#[command(name = "financing-simulator", version, about = "Compare mortgage financing across lenders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding lenders.json and program_tiers.csv (built-in lenders when omitted)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Simulation config JSON (defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a request against every selected lender
    Simulate(SimulateArgs),
    /// Print and export the schedule of one lender
    Schedule(ScheduleArgs),
    /// List configured lenders
    Lenders,
}

#[derive(Args)]
struct RequestArgs {
    /// Loan request JSON
    #[arg(long, short)]
    request: PathBuf,

    /// Simulation date (YYYY-MM-DD), today when omitted
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

#[derive(Args)]
struct SimulateArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Evaluate lenders in parallel
    #[arg(long)]
    parallel: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScheduleArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Lender id
    #[arg(long, short)]
    lender: String,

    /// CSV output path
    #[arg(long, short, default_value = "schedule_output.csv")]
    output: PathBuf,

    /// Installments printed to the console
    #[arg(long, default_value_t = 12)]
    preview: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimulationConfig::from_json_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    let aggregator = ComparisonAggregator::new(config, load_catalog(cli.data_dir.as_ref())?);

    match cli.command {
        Commands::Simulate(args) => run_simulate(&aggregator, args),
        Commands::Schedule(args) => run_schedule(&aggregator, args),
        Commands::Lenders => {
            print_lenders(aggregator.lenders());
            Ok(())
        }
    }
}

fn load_catalog(data_dir: Option<&PathBuf>) -> Result<LenderCatalog> {
    match data_dir {
        Some(dir) => LenderCatalog::from_path(dir)
            .map_err(|e| anyhow!("Failed to load lenders from {}: {}", dir.display(), e)),
        None => {
            let default_dir = PathBuf::from(DEFAULT_LENDER_DATA_PATH);
            if default_dir.join("lenders.json").exists() {
                LenderCatalog::from_path(&default_dir)
                    .map_err(|e| anyhow!("Failed to load lenders from {}: {}", default_dir.display(), e))
            } else {
                Ok(LenderCatalog::default_catalog())
            }
        }
    }
}

fn load_request(args: &RequestArgs) -> Result<(LoanRequest, NaiveDate)> {
    let text = fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request {}", args.request.display()))?;
    let request: LoanRequest = serde_json::from_str(&text).context("Invalid request JSON")?;
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    Ok((request, as_of))
}

fn run_simulate(aggregator: &ComparisonAggregator, args: SimulateArgs) -> Result<()> {
    let (request, as_of) = load_request(&args.request)?;

    let results = if args.parallel {
        aggregator.compare_parallel(&request, as_of)?
    } else {
        aggregator.compare(&request, as_of)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("Financing Simulator v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");
    println!("Property value:      R$ {:.2}", request.property_value);
    println!(
        "Requested principal: R$ {:.2} ({:.1}% LTV)",
        request.requested_principal,
        request.loan_to_value() * 100.0
    );
    println!(
        "Income:              R$ {:.2} (affordability limit {:.0}%)",
        request.combined_monthly_income,
        aggregator.config().affordability_ratio * 100.0
    );
    println!(
        "Term: {} months, {} / {}, as of {}",
        request.term_months, request.amortization_system, request.correction_index, as_of
    );
    println!();

    for result in results.values() {
        println!("  {}", result.summary());
        if let Some(note) = &result.adjustment_note {
            println!("    note: {note}");
        }
        if let Some(tier) = &result.program_tier {
            println!("    program: {tier}");
        }
    }

    let ranked = rank_by_cost(&results);
    if !ranked.is_empty() {
        println!("\nBy effective cost:");
        for (position, id) in ranked.iter().enumerate() {
            let result = &results[*id];
            println!(
                "  {}. {:<28} {:>6.2}% a.a.",
                position + 1,
                result.lender_name,
                result.effective_annual_cost_rate.unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn run_schedule(aggregator: &ComparisonAggregator, args: ScheduleArgs) -> Result<()> {
    let (request, as_of) = load_request(&args.request)?;
    let result = aggregator.simulate(&request, &args.lender, as_of)?;

    println!("{}", result.summary());
    if !result.feasible {
        return Ok(());
    }

    println!(
        "\n{:>5} {:>14} {:>12} {:>12} {:>10} {:>10} {:>12} {:>14}",
        "#", "Opening", "Interest", "Amort", "MIP", "DFI", "Payment", "Closing"
    );
    println!("{}", "-".repeat(96));
    for line in result.schedule.iter().take(args.preview) {
        println!(
            "{:>5} {:>14.2} {:>12.2} {:>12.2} {:>10.2} {:>10.2} {:>12.2} {:>14.2}",
            line.index,
            line.opening_balance,
            line.interest,
            line.amortization,
            line.insurance_mip,
            line.insurance_dfi,
            line.total_payment,
            line.outstanding_balance_after
        );
    }
    if result.schedule.len() > args.preview {
        println!("... ({} more installments)", result.schedule.len() - args.preview);
    }

    let totals = &result.totals;
    println!("\nTotals:");
    println!("  Paid:      R$ {:.2}", totals.total_paid);
    println!("  Interest:  R$ {:.2}", totals.total_interest);
    println!("  Insurance: R$ {:.2} (MIP {:.2}, DFI {:.2})", totals.total_insurance, totals.total_mip, totals.total_dfi);
    if totals.total_correction > 0.0 {
        println!("  Correction: R$ {:.2}", totals.total_correction);
    }

    export_schedule_csv(&result.schedule, &args.output)
        .map_err(|e| anyhow!("Failed to write {}: {}", args.output.display(), e))?;
    println!("\nFull schedule written to: {}", args.output.display());

    Ok(())
}

fn print_lenders(catalog: &LenderCatalog) {
    println!("{} lender(s)\n", catalog.len());
    for lender in catalog.profiles() {
        println!("{} ({})", lender.display_name, lender.id);
        println!(
            "  max financing {:.0}%, min down payment {:.0}%{}",
            lender.max_financing_ratio * 100.0,
            lender.min_down_payment_ratio * 100.0,
            lender
                .special_max_term_months
                .map(|m| format!(", max term {m} months"))
                .unwrap_or_default()
        );
        for entry in lender.rate_table.entries() {
            println!("  {:<6} {:<9} {:>6.2}% a.a.", entry.system.as_str(), entry.index.as_str(), entry.annual_rate_pct);
        }
        for (system, ratio) in &lender.system_overrides {
            println!("  {system} financing capped at {:.0}%", ratio * 100.0);
        }
        if let Some(tiers) = &lender.program_tiers {
            for bracket in &tiers.brackets {
                println!(
                    "  program {}: income {:.2}-{:.2}, {:.2}% a.a., cap {:.0}%",
                    bracket.label,
                    bracket.min_income,
                    bracket.max_income,
                    bracket.special_annual_rate_pct,
                    bracket.financing_ratio_cap * 100.0
                );
            }
        }
        println!();
    }
}
