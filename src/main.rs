//! MFI Metrics CLI
//!
//! Builds the dataset for a hierarchy and prints one view of it

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use mfi_metrics::geography::{load_hierarchy, DEFAULT_COMPANY_NAME};
use mfi_metrics::history::PortfolioSummary;
use mfi_metrics::{
    Assumptions, DpdBucket, EngineConfig, EntityPath, FinancialMetric, GeoHierarchy, MetricsDataset,
    MetricsEngine, MonthlyMetric, RankBy,
};

/// Synthetic portfolio, collections and risk metrics for an MFI branch network
#[derive(Parser, Debug)]
#[command(name = "mfi-metrics", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Directory with seasonality.csv and modeling_constants.csv
    #[arg(long, global = true)]
    assumptions: Option<PathBuf>,

    /// Hierarchy CSV (built-in network when omitted)
    #[arg(long, global = true)]
    hierarchy: Option<PathBuf>,

    /// Generate entities on one thread
    #[arg(long, global = true)]
    serial: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Monthly history of one entity
    History {
        /// Entity path such as "Karnataka/Mysuru"; company when omitted
        entity: Option<String>,
    },
    /// Company income statement by month
    Financials,
    /// DPD bands for one entity
    Dpd {
        entity: Option<String>,

        /// Month index (0-based); current month when omitted
        #[arg(long)]
        month: Option<usize>,
    },
    /// Headline KPIs for an entity and, optionally, its children ranked
    Summary {
        entity: Option<String>,

        /// Rank direct children by par30 or balance
        #[arg(long)]
        rank: Option<String>,
    },
    /// Check every rollup and leaf snap
    Verify,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let dataset = build_dataset(&cli)?;

    match &cli.command {
        Commands::History { entity } => {
            let series = dataset.series(&entity_path(entity))?.rounded();
            emit(cli.format, &series.months, print_history)?;
        }
        Commands::Financials => {
            let series = dataset.financials().rounded();
            emit(cli.format, &series.months, print_financials)?;
        }
        Commands::Dpd { entity, month } => {
            let buckets = dataset.dpd(&entity_path(entity), *month)?;
            emit(cli.format, &buckets, print_dpd)?;
        }
        Commands::Summary { entity, rank } => {
            let path = entity_path(entity);
            let mut rows = vec![dataset.summary(&path)?];
            if let Some(rank) = rank {
                let by = RankBy::parse(rank)
                    .with_context(|| format!("Unknown ranking '{}' (use par30 or balance)", rank))?;
                for child in dataset.rank_children(&path, by)? {
                    rows.push(dataset.summary(&child.path)?);
                }
            }
            emit(cli.format, &rows, print_summaries)?;
        }
        Commands::Verify => {
            let issues = dataset.consistency_issues();
            if issues.is_empty() {
                println!(
                    "OK: {} entities x {} months consistent",
                    dataset.all_series().len(),
                    dataset.company().len()
                );
            } else {
                for issue in &issues {
                    eprintln!("{}", issue);
                }
                bail!("{} consistency issues", issues.len());
            }
        }
    }

    Ok(())
}

fn build_dataset(cli: &Cli) -> Result<MetricsDataset> {
    let assumptions = match &cli.assumptions {
        Some(dir) => Assumptions::from_csv_path(dir)
            .with_context(|| format!("Failed to load assumptions from {}", dir.display()))?,
        None => Assumptions::default_mfi(),
    };
    let hierarchy = match &cli.hierarchy {
        Some(file) => load_hierarchy(file, DEFAULT_COMPANY_NAME)
            .with_context(|| format!("Failed to load hierarchy from {}", file.display()))?,
        None => GeoHierarchy::builtin(),
    };

    let config = EngineConfig {
        parallel: !cli.serial,
        ..Default::default()
    };
    MetricsEngine::new(assumptions, config)
        .build(hierarchy)
        .context("Failed to build dataset")
}

fn entity_path(entity: &Option<String>) -> EntityPath {
    entity.as_deref().map(EntityPath::from).unwrap_or_default()
}

fn emit<T: Serialize>(format: OutputFormat, rows: &[T], table: fn(&[T])) -> Result<()> {
    match format {
        OutputFormat::Table => table(rows),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(io::stdout().lock());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

fn print_history(months: &[MonthlyMetric]) {
    println!(
        "{:>6} {:>16} {:>8} {:>14} {:>14} {:>14} {:>7} {:>7} {:>7} {:>7}",
        "Month", "Balance", "Clients", "Disbursed", "Due", "Collected", "PAR30", "PAR60", "PAR90", "PAR180"
    );
    println!("{}", "-".repeat(110));
    for m in months {
        println!(
            "{:>6} {:>16.2} {:>8} {:>14.2} {:>14.2} {:>14.2} {:>7.2} {:>7.2} {:>7.2} {:>7.2}",
            m.label,
            m.loan_balance,
            m.client_count,
            m.disbursement,
            m.amount_due,
            m.amount_collected,
            m.par30,
            m.par60,
            m.par90,
            m.par180,
        );
    }
}

fn print_financials(months: &[FinancialMetric]) {
    println!(
        "{:>6} {:>7} {:>7} {:>13} {:>13} {:>13} {:>12} {:>12} {:>6} {:>6} {:>6} {:>6}",
        "Month", "Yield", "CoF", "Interest", "NII", "Opex", "Provision", "PAT", "NIM", "ROA", "ROE", "CAR"
    );
    println!("{}", "-".repeat(120));
    for m in months {
        println!(
            "{:>6} {:>7.2} {:>7.2} {:>13.2} {:>13.2} {:>13.2} {:>12.2} {:>12.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2}",
            m.label,
            m.portfolio_yield,
            m.cost_of_funds,
            m.interest_income,
            m.net_interest_income,
            m.operating_expense,
            m.provision_expense,
            m.profit_after_tax,
            m.net_interest_margin,
            m.return_on_assets,
            m.return_on_equity,
            m.capital_adequacy_ratio,
        );
    }
}

fn print_dpd(buckets: &[DpdBucket]) {
    println!("{:<12} {:>16} {:>10} {:>8}", "Band", "Amount", "Accounts", "Pct");
    println!("{}", "-".repeat(50));
    for b in buckets {
        println!("{:<12} {:>16.2} {:>10} {:>8.2}", b.label, b.amount, b.accounts, b.percentage);
    }
}

fn print_summaries(rows: &[PortfolioSummary]) {
    println!(
        "{:<24} {:>9} {:>16} {:>8} {:>10} {:>7} {:>8} {:>8} {:>8}",
        "Entity", "Level", "Balance", "Clients", "Ticket", "PAR30", "CE YTD", "Digital", "Growth"
    );
    println!("{}", "-".repeat(110));
    for s in rows {
        println!(
            "{:<24} {:>9} {:>16.2} {:>8} {:>10.2} {:>7.2} {:>8.2} {:>8.2} {:>8.2}",
            s.name,
            s.level.as_str(),
            s.loan_balance,
            s.client_count,
            s.average_ticket_size,
            s.par30,
            s.ytd_collection_efficiency,
            s.ytd_digital_adoption,
            s.ytd_growth_pct,
        );
    }
}
