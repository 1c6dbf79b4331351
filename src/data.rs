//! Data loading and transaction preparation using Polars

use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RfvError;

/// Days from 0001-01-01 to 1970-01-01, the epoch Polars counts `Date` values from.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Temporary column holding each row's 1-based position in the input file
const SOURCE_ROW: &str = "__source_row";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Names of the input columns holding each transaction field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub customer: String,
    pub date: String,
    pub transaction: String,
    pub amount: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            customer: "ID_cliente".to_string(),
            date: "DiaCompra".to_string(),
            transaction: "CodigoCompra".to_string(),
            amount: "ValorTotal".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn required(&self) -> [&str; 4] {
        [
            self.customer.as_str(),
            self.date.as_str(),
            self.transaction.as_str(),
            self.amount.as_str(),
        ]
    }
}

/// A single purchase
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: String,
    pub purchase_date: NaiveDate,
    pub transaction_id: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<String>,
        purchase_date: NaiveDate,
        transaction_id: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            purchase_date,
            transaction_id: transaction_id.into(),
            amount,
        }
    }
}

/// Inclusive date window; an open side is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Parse a calendar date, accepting plain dates, timestamps and RFC 3339.
/// The time of day, if present, is discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|datetime| datetime.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

/// Convert a date to the day number Polars stores for `Date` values
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Read a CSV file with a header row into a DataFrame
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame, RfvError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "reading csv");

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(rows = df.height(), columns = df.width(), "csv loaded");
    Ok(df)
}

/// Fail with `MissingColumn` naming the first absent column
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), RfvError> {
    match columns.iter().find(|name| df.column(name).is_err()) {
        Some(missing) => Err(RfvError::MissingColumn((*missing).to_string())),
        None => Ok(()),
    }
}

/// Replace a textual date column with a Polars `Date` column.
/// Columns that are already `Date` are left untouched.
pub fn parse_date_column(df: &mut DataFrame, column: &str) -> Result<(), RfvError> {
    if df.column(column)?.dtype() == &DataType::Date {
        return Ok(());
    }

    let raw = df.column(column)?.cast(&DataType::String)?;
    let values = raw.as_materialized_series().str()?;

    let mut days = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let date = value.and_then(parse_date).ok_or_else(|| RfvError::InvalidDate {
            column: column.to_string(),
            row: index + 1,
            value: value.unwrap_or("<missing>").to_string(),
        })?;
        days.push(date_to_days(date));
    }

    let dates = Series::new(column.into(), days).cast(&DataType::Date)?;
    df.with_column(dates)?;
    Ok(())
}

/// Coerce a column to `Float64`, rejecting values that are not numbers
pub fn numeric_column(df: &mut DataFrame, column: &str) -> Result<(), RfvError> {
    let values = df
        .column(column)?
        .as_materialized_series()
        .strict_cast(&DataType::Float64)
        .map_err(|e| RfvError::InvalidAmount {
            column: column.to_string(),
            reason: e.to_string(),
        })?;
    df.with_column(values)?;
    Ok(())
}

/// Keep rows whose date falls inside `range`; `column` must already be a `Date` column
pub fn filter_date_range(
    df: DataFrame,
    column: &str,
    range: &DateRange,
) -> Result<DataFrame, RfvError> {
    if range.is_unbounded() {
        return Ok(df);
    }

    let day = col(column).cast(DataType::Int32);
    let mut predicate = lit(true);
    if let Some(from) = range.from {
        predicate = predicate.and(day.clone().gt_eq(lit(date_to_days(from))));
    }
    if let Some(to) = range.to {
        predicate = predicate.and(day.lt_eq(lit(date_to_days(to))));
    }

    let before = df.height();
    let filtered = df.lazy().filter(predicate).collect()?;
    debug!(
        before,
        after = filtered.height(),
        from = ?range.from,
        to = ?range.to,
        "applied date range"
    );
    Ok(filtered)
}

/// Validate and normalize a raw transaction frame.
///
/// Rows without a customer or transaction id are dropped, dates are parsed,
/// amounts are coerced to `Float64` and the optional date range is applied.
pub fn prepare_transactions(
    df: DataFrame,
    columns: &ColumnMap,
    range: &DateRange,
) -> Result<DataFrame, RfvError> {
    require_columns(&df, &columns.required())?;

    let before = df.height();
    let mut df = df
        .with_row_index(SOURCE_ROW.into(), Some(1))?
        .lazy()
        .filter(
            col(columns.customer.as_str())
                .is_not_null()
                .and(col(columns.transaction.as_str()).is_not_null()),
        )
        .collect()?;

    let dropped = before - df.height();
    if dropped > 0 {
        warn!(
            dropped,
            customer = %columns.customer,
            transaction = %columns.transaction,
            "dropped rows without customer or transaction id"
        );
    }

    // report bad dates against the input row, not the retained one
    if let Err(err) = parse_date_column(&mut df, &columns.date) {
        return Err(match err {
            RfvError::InvalidDate { column, row, value } => RfvError::InvalidDate {
                row: source_row(&df, row).unwrap_or(row),
                column,
                value,
            },
            other => other,
        });
    }
    numeric_column(&mut df, &columns.amount)?;
    let df = df.drop(SOURCE_ROW)?;
    filter_date_range(df, &columns.date, range)
}

fn source_row(df: &DataFrame, row: usize) -> Option<usize> {
    let rows = df.column(SOURCE_ROW).ok()?.as_materialized_series().idx().ok()?;
    rows.get(row.checked_sub(1)?).map(|r| r as usize)
}

/// Load a transaction CSV and prepare it for aggregation
pub fn load_transactions(
    path: impl AsRef<Path>,
    columns: &ColumnMap,
    range: &DateRange,
) -> Result<DataFrame, RfvError> {
    let df = read_csv(path)?;
    prepare_transactions(df, columns, range)
}

/// Build a prepared transaction frame from in-memory records
pub fn transactions_frame(
    transactions: &[Transaction],
    columns: &ColumnMap,
) -> Result<DataFrame, RfvError> {
    let customers: Vec<&str> = transactions.iter().map(|t| t.customer_id.as_str()).collect();
    let days: Vec<i32> = transactions.iter().map(|t| date_to_days(t.purchase_date)).collect();
    let ids: Vec<&str> = transactions.iter().map(|t| t.transaction_id.as_str()).collect();
    let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();

    let df = DataFrame::new(vec![
        Series::new(columns.customer.as_str().into(), customers).into(),
        Series::new(columns.date.as_str().into(), days)
            .cast(&DataType::Date)?
            .into(),
        Series::new(columns.transaction.as_str().into(), ids).into(),
        Series::new(columns.amount.as_str().into(), amounts).into(),
    ])?;
    Ok(df)
}
