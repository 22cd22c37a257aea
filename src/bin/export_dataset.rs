//! Export the full dataset to CSV
//!
//! Writes one row per entity and month to history.csv and the company
//! income statement to financials.csv. All figures are rounded for
//! publication.
//!
//! Usage: export_dataset [OUTPUT_DIR] [HIERARCHY_CSV]

use anyhow::{Context, Result};
use chrono::NaiveDate;
use mfi_metrics::geography::{load_hierarchy, DEFAULT_COMPANY_NAME};
use mfi_metrics::{GeoHierarchy, HistorySeries, MetricsEngine};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

/// One entity-month in the flat export
#[derive(Debug, Serialize)]
struct HistoryRow {
    entity: String,
    level: &'static str,
    month: NaiveDate,
    label: String,
    loan_balance: f64,
    client_count: u64,
    disbursement: f64,
    amount_due: f64,
    amount_collected: f64,
    digital_collected: f64,
    par30: f64,
    par60: f64,
    par90: f64,
    par180: f64,
}

fn rows_for(series: &HistorySeries) -> Vec<HistoryRow> {
    let entity = if series.path.is_root() {
        series.name.clone()
    } else {
        series.path.to_string()
    };
    series
        .rounded()
        .months
        .into_iter()
        .map(|m| HistoryRow {
            entity: entity.clone(),
            level: series.level.as_str(),
            month: m.month,
            label: m.label,
            loan_balance: m.loan_balance,
            client_count: m.client_count,
            disbursement: m.disbursement,
            amount_due: m.amount_due,
            amount_collected: m.amount_collected,
            digital_collected: m.digital_collected,
            par30: m.par30,
            par60: m.par60,
            par90: m.par90,
            par180: m.par180,
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output_dir = PathBuf::from(args.next().unwrap_or_else(|| "output".to_string()));
    let hierarchy = match args.next() {
        Some(file) => load_hierarchy(&file, DEFAULT_COMPANY_NAME)
            .with_context(|| format!("Failed to load hierarchy from {}", file))?,
        None => GeoHierarchy::builtin(),
    };

    let start = Instant::now();
    let dataset = MetricsEngine::default().build(hierarchy)?;
    dataset.verify().context("Generated dataset failed verification")?;
    println!(
        "Built {} entities in {:?}",
        dataset.all_series().len(),
        start.elapsed()
    );

    // Rounding and flattening per entity in parallel, order preserved
    let rows: Vec<HistoryRow> = dataset
        .all_series()
        .par_iter()
        .flat_map_iter(rows_for)
        .collect();

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let history_path = output_dir.join("history.csv");
    let mut wtr = csv::Writer::from_path(&history_path)
        .with_context(|| format!("Failed to create {}", history_path.display()))?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    println!("Wrote {} rows to {}", rows.len(), history_path.display());

    let financials_path = output_dir.join("financials.csv");
    let mut wtr = csv::Writer::from_path(&financials_path)
        .with_context(|| format!("Failed to create {}", financials_path.display()))?;
    let financials = dataset.financials().rounded();
    for month in &financials.months {
        wtr.serialize(month)?;
    }
    wtr.flush()?;
    println!("Wrote {} rows to {}", financials.len(), financials_path.display());

    let summary = dataset.financials().summary();
    println!("\nYear to date ({} months):", summary.months);
    println!("  Interest income: {:>16.2}", summary.interest_income);
    println!("  Operating exp:   {:>16.2}", summary.operating_expense);
    println!("  Provisions:      {:>16.2}", summary.provision_expense);
    println!("  Profit after tax:{:>16.2}", summary.profit_after_tax);
    println!("  Current CAR:     {:>16.2}", summary.current_car);

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
