//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::data::{parse_date, DateRange};

/// Customer segmentation by Recency, Frequency and Value quartiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to an optional TOML settings file
    #[arg(short, long, default_value = "rfvforge.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score customers from a transaction CSV and export the labelled table
    Segment(SegmentArgs),
    /// Render descriptive charts for a SINASC natality CSV
    Natality(NatalityArgs),
}

/// Inclusive date window shared by both commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DateRangeArgs {
    /// First date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,
}

impl DateRangeArgs {
    pub fn to_range(&self) -> crate::Result<DateRange> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                anyhow::bail!("--from ({}) must not be after --to ({})", from, to);
            }
        }
        Ok(DateRange::new(self.from, self.to))
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct SegmentArgs {
    /// Path to the transaction CSV file
    #[arg(short, long, default_value = "compras.csv")]
    pub input: PathBuf,

    #[command(flatten)]
    pub range: DateRangeArgs,

    /// Output path for the labelled CSV table
    #[arg(long, default_value = "RFV_.csv")]
    pub csv: PathBuf,

    /// Output path for the labelled XLSX table
    #[arg(long, default_value = "RFV_.xlsx")]
    pub xlsx: PathBuf,

    /// Output path for the score distribution chart
    #[arg(long, default_value = "rfv_scores.png")]
    pub chart: PathBuf,

    /// Classify one customer instead of exporting: comma-separated R,F,V values
    /// Example: --classify "12,4,350.0" for Recency=12, Frequency=4, Value=350.0
    #[arg(long)]
    pub classify: Option<String>,
}

impl SegmentArgs {
    /// Parse RFV values from the classify string
    /// Expected format: "recency,frequency,value"
    pub fn parse_rfv_values(&self) -> crate::Result<Option<(f64, f64, f64)>> {
        let Some(ref raw) = self.classify else {
            return Ok(None);
        };

        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() != 3 {
            anyhow::bail!("Classify values must be in format 'recency,frequency,value'");
        }

        let parse = |name: &str, part: &str| -> crate::Result<f64> {
            part.trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", name, part))
        };

        Ok(Some((
            parse("recency", parts[0])?,
            parse("frequency", parts[1])?,
            parse("value", parts[2])?,
        )))
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct NatalityArgs {
    /// Path to the natality CSV file
    #[arg(short, long, default_value = "input/SINASC_RO_2019.csv")]
    pub input: PathBuf,

    #[command(flatten)]
    pub range: DateRangeArgs,

    /// Directory for the generated charts
    #[arg(short, long, default_value = "natality_charts")]
    pub output_dir: PathBuf,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}
