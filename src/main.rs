//! RfvForge: RFV customer segmentation and natality charts
//!
//! This is the main entrypoint that orchestrates data loading, segmentation,
//! export and visualization.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rfvforge::cli::{Command, NatalityArgs, SegmentArgs};
use rfvforge::{
    aggregate_frame, export, load_transactions, natality, segment_customers, viz, ActionTable,
    Args, RfvTable, Settings,
};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = Settings::load(&args.config)?;
    debug!(?settings, "settings loaded");

    match &args.command {
        Command::Segment(segment_args) => {
            let actions = settings.action_table()?;
            if let Some(rfv_values) = segment_args.parse_rfv_values()? {
                run_prediction_mode(segment_args, &settings, &actions, rfv_values)
            } else {
                run_full_pipeline(segment_args, &settings, &actions)
            }
        }
        Command::Natality(natality_args) => run_natality_report(natality_args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .init();
}

/// Load, aggregate and segment the input file
fn build_table(args: &SegmentArgs, settings: &Settings, actions: &ActionTable) -> Result<RfvTable> {
    let range = args.range.to_range()?;
    let transactions = load_transactions(&args.input, &settings.columns, &range)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(rows = transactions.height(), "transactions loaded");

    let metrics = aggregate_frame(&transactions, &settings.columns)?;
    info!(customers = metrics.len(), "customer metrics computed");

    Ok(segment_customers(metrics, actions)?)
}

/// Classify a single customer against the thresholds of the input dataset
fn run_prediction_mode(
    args: &SegmentArgs,
    settings: &Settings,
    actions: &ActionTable,
    rfv_values: (f64, f64, f64),
) -> Result<()> {
    println!("=== Classification Mode ===");
    println!(
        "Input RFV values: R={}, F={}, V={}",
        rfv_values.0, rfv_values.1, rfv_values.2
    );

    let start_time = Instant::now();
    let table = build_table(args, settings, actions)?;
    let classification = table.classify_values(rfv_values.0, rfv_values.1, rfv_values.2, actions);
    let elapsed = start_time.elapsed();

    println!("\n✓ RFV score: {}", classification.score);
    println!(
        "  Action: {}",
        classification.action.as_deref().unwrap_or("<no action>")
    );
    println!("  Processing time: {:.2}s", elapsed.as_secs_f64());

    let customers_with_score = table
        .customers
        .iter()
        .filter(|c| c.classification.score == classification.score)
        .count();
    println!(
        "\n{} of {} customers in the dataset share this score",
        customers_with_score,
        table.len()
    );

    Ok(())
}

/// Run the full segmentation pipeline and write every output
fn run_full_pipeline(args: &SegmentArgs, settings: &Settings, actions: &ActionTable) -> Result<()> {
    println!("=== RFV Segmentation Pipeline ===\n");
    let start_time = Instant::now();

    let table = build_table(args, settings, actions)?;
    println!("✓ Segmented {} customers", table.len());

    viz::generate_rfv_report(&table, &args.chart)?;

    export::write_csv_file(&table, &args.csv, &settings.csv_null_value)?;
    export::write_xlsx_file(&table, &args.xlsx)?;

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());
    println!("CSV saved to: {}", args.csv.display());
    println!("XLSX saved to: {}", args.xlsx.display());
    println!("Score chart saved to: {}", args.chart.display());

    Ok(())
}

/// Filter the natality data and render its charts
fn run_natality_report(args: &NatalityArgs) -> Result<()> {
    println!("=== Natality Report ===\n");
    let start_time = Instant::now();

    let range = args.range.to_range()?;
    let births = natality::load_natality(&args.input, &range)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    println!("✓ Births in range: {}", births.height());

    let charts = natality::generate_natality_report(&births, &args.output_dir)?;

    println!("\n=== Report Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    for chart in charts {
        println!("Chart saved to: {}", chart.display());
    }

    Ok(())
}
