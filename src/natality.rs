//! Descriptive pivot charts over a SINASC natality dataset
//!
//! Births are filtered by an inclusive date range, then grouped by birth
//! date, sex, mother's schooling or gestation and summarised with a mean or
//! median.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::debug;

use crate::data::{filter_date_range, parse_date_column, read_csv, require_columns, DateRange};
use crate::error::RfvError;
use crate::viz::{draw_bar_chart, draw_date_lines, DateSeries};

pub const BIRTH_DATE: &str = "DTNASC";
pub const MOTHER_AGE: &str = "IDADEMAE";
pub const SEX: &str = "SEXO";
pub const WEIGHT: &str = "PESO";
pub const MOTHER_SCHOOLING: &str = "ESCMAE";
pub const APGAR1: &str = "APGAR1";
pub const GESTATION: &str = "GESTACAO";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Median,
}

impl Aggregation {
    fn apply(self, expr: Expr) -> Expr {
        match self {
            Aggregation::Mean => expr.mean(),
            Aggregation::Median => expr.median(),
        }
    }
}

/// Load the natality CSV, parse birth dates and keep births inside `range`
pub fn load_natality(path: impl AsRef<Path>, range: &DateRange) -> Result<DataFrame, RfvError> {
    let mut df = read_csv(path)?;
    require_columns(
        &df,
        &[BIRTH_DATE, MOTHER_AGE, SEX, WEIGHT, MOTHER_SCHOOLING, APGAR1, GESTATION],
    )?;
    parse_date_column(&mut df, BIRTH_DATE)?;

    let df = filter_date_range(df, BIRTH_DATE, range)?;
    if df.height() == 0 {
        return Err(RfvError::EmptyDataset);
    }
    debug!(births = df.height(), "natality data loaded");
    Ok(df)
}

/// `value` aggregated per birth date, in date order
pub fn pivot_by_date(
    df: &DataFrame,
    value: &str,
    aggregation: Aggregation,
) -> Result<Vec<(i32, f64)>, RfvError> {
    require_columns(df, &[BIRTH_DATE, value])?;

    let pivot = df
        .clone()
        .lazy()
        .group_by([col(BIRTH_DATE)])
        .agg([aggregation
            .apply(col(value).cast(DataType::Float64))
            .alias(value)])
        .sort([BIRTH_DATE], SortMultipleOptions::default())
        .select([col(BIRTH_DATE).cast(DataType::Int32), col(value)])
        .collect()?;

    let days = pivot.column(BIRTH_DATE)?.as_materialized_series().i32()?;
    let values = pivot.column(value)?.as_materialized_series().f64()?;
    Ok(days
        .into_iter()
        .zip(values)
        .filter_map(|(day, value)| Some((day?, value?)))
        .collect())
}

/// `value` aggregated per birth date, one series per distinct `group` value
pub fn pivot_by_date_and(
    df: &DataFrame,
    value: &str,
    group: &str,
    aggregation: Aggregation,
) -> Result<Vec<DateSeries>, RfvError> {
    require_columns(df, &[BIRTH_DATE, value, group])?;

    let pivot = df
        .clone()
        .lazy()
        .filter(col(group).is_not_null())
        .group_by([col(BIRTH_DATE), col(group)])
        .agg([aggregation
            .apply(col(value).cast(DataType::Float64))
            .alias(value)])
        .sort([group, BIRTH_DATE], SortMultipleOptions::default())
        .select([
            col(BIRTH_DATE).cast(DataType::Int32),
            col(group).cast(DataType::String),
            col(value),
        ])
        .collect()?;

    let days = pivot.column(BIRTH_DATE)?.as_materialized_series().i32()?;
    let groups = pivot.column(group)?.as_materialized_series().str()?;
    let values = pivot.column(value)?.as_materialized_series().f64()?;

    let mut series: BTreeMap<String, Vec<(i32, f64)>> = BTreeMap::new();
    for ((day, label), value) in days.into_iter().zip(groups).zip(values) {
        if let (Some(day), Some(label), Some(value)) = (day, label, value) {
            series.entry(label.to_string()).or_default().push((day, value));
        }
    }

    Ok(series
        .into_iter()
        .map(|(label, points)| DateSeries { label, points })
        .collect())
}

/// `value` aggregated per `index` category, sorted ascending by the aggregate
pub fn pivot_sorted(
    df: &DataFrame,
    value: &str,
    index: &str,
    aggregation: Aggregation,
) -> Result<Vec<(String, f64)>, RfvError> {
    require_columns(df, &[index, value])?;

    let pivot = df
        .clone()
        .lazy()
        .filter(col(index).is_not_null())
        .group_by([col(index)])
        .agg([aggregation
            .apply(col(value).cast(DataType::Float64))
            .alias(value)])
        .filter(col(value).is_not_null())
        .sort([value], SortMultipleOptions::default())
        .select([col(index).cast(DataType::String), col(value)])
        .collect()?;

    let labels = pivot.column(index)?.as_materialized_series().str()?;
    let values = pivot.column(value)?.as_materialized_series().f64()?;
    Ok(labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, value)| Some((label?.to_string(), value?)))
        .collect())
}

/// Render the five natality charts into `output_dir`, returning their paths
pub fn generate_natality_report(df: &DataFrame, output_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let age_path = output_dir.join("mother_age_by_date.png");
    let age = DateSeries {
        label: MOTHER_AGE.to_string(),
        points: pivot_by_date(df, MOTHER_AGE, Aggregation::Mean)?,
    };
    draw_date_lines(
        &age_path,
        "Mean mother age by birth date",
        "birth date",
        "mean mother age",
        &[age],
    )?;

    let age_sex_path = output_dir.join("mother_age_by_date_and_sex.png");
    draw_date_lines(
        &age_sex_path,
        "Mean mother age by birth date and sex",
        "birth date",
        "mean mother age",
        &pivot_by_date_and(df, MOTHER_AGE, SEX, Aggregation::Mean)?,
    )?;

    let weight_sex_path = output_dir.join("weight_by_date_and_sex.png");
    draw_date_lines(
        &weight_sex_path,
        "Mean baby weight by birth date and sex",
        "birth date",
        "mean weight",
        &pivot_by_date_and(df, WEIGHT, SEX, Aggregation::Mean)?,
    )?;

    let schooling_path = output_dir.join("weight_by_mother_schooling.png");
    draw_bar_chart(
        &schooling_path,
        "Median baby weight by mother's schooling",
        "mother's schooling",
        "median weight",
        &pivot_sorted(df, WEIGHT, MOTHER_SCHOOLING, Aggregation::Median)?,
    )?;

    let apgar_path = output_dir.join("apgar1_by_gestation.png");
    draw_bar_chart(
        &apgar_path,
        "Mean APGAR1 by gestation",
        "gestation",
        "mean APGAR1",
        &pivot_sorted(df, APGAR1, GESTATION, Aggregation::Mean)?,
    )?;

    Ok(vec![
        age_path,
        age_sex_path,
        weight_sex_path,
        schooling_path,
        apgar_path,
    ])
}
