//! Per-customer Recency, Frequency and Value aggregation

use polars::prelude::*;
use tracing::debug;

use crate::data::{require_columns, transactions_frame, ColumnMap, Transaction};
use crate::error::RfvError;
use crate::segment::Metric;

pub const RECENCY: &str = "Recencia";
pub const FREQUENCY: &str = "Frequencia";
pub const VALUE: &str = "Valor";

const LAST_PURCHASE: &str = "DiaUltimaCompra";

/// Aggregated purchase behaviour of one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the last purchase in the dataset and this customer's last purchase
    pub recency: i64,
    /// Number of transactions
    pub frequency: u32,
    /// Total amount spent
    pub value: f64,
}

impl CustomerMetrics {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Recency => self.recency as f64,
            Metric::Frequency => self.frequency as f64,
            Metric::Value => self.value,
        }
    }
}

/// Latest date in the dataset, as a Polars day number
pub fn reference_day(df: &DataFrame, date_column: &str) -> Result<Option<i32>, RfvError> {
    let days = df.column(date_column)?.cast(&DataType::Int32)?;
    Ok(days.as_materialized_series().i32()?.max())
}

/// Compute RFV metrics from a prepared transaction frame.
///
/// The frame must come from [`crate::data::prepare_transactions`] or
/// [`transactions_frame`]. Customers are returned sorted by their key.
pub fn aggregate_frame(
    df: &DataFrame,
    columns: &ColumnMap,
) -> Result<Vec<CustomerMetrics>, RfvError> {
    require_columns(df, &columns.required())?;

    let Some(reference) = reference_day(df, &columns.date)? else {
        debug!("no transactions to aggregate");
        return Ok(Vec::new());
    };

    let customer = columns.customer.as_str();
    let rfv = df
        .clone()
        .lazy()
        .group_by([col(customer)])
        .agg([
            col(columns.date.as_str())
                .cast(DataType::Int32)
                .max()
                .alias(LAST_PURCHASE),
            col(columns.transaction.as_str()).count().alias(FREQUENCY),
            col(columns.amount.as_str())
                .cast(DataType::Float64)
                .sum()
                .alias(VALUE),
        ])
        .with_columns([(lit(reference) - col(LAST_PURCHASE))
            .cast(DataType::Int64)
            .alias(RECENCY)])
        .sort([customer], SortMultipleOptions::default())
        .select([
            col(customer).cast(DataType::String),
            col(RECENCY),
            col(FREQUENCY).cast(DataType::UInt32),
            col(VALUE),
        ])
        .collect()?;

    let metrics = metrics_from_frame(&rfv, customer)?;
    debug!(
        customers = metrics.len(),
        reference_day = reference,
        "aggregated customer metrics"
    );
    Ok(metrics)
}

/// Compute RFV metrics from in-memory transactions
pub fn aggregate_transactions(
    transactions: &[Transaction],
) -> Result<Vec<CustomerMetrics>, RfvError> {
    let columns = ColumnMap::default();
    let df = transactions_frame(transactions, &columns)?;
    aggregate_frame(&df, &columns)
}

fn metrics_from_frame(rfv: &DataFrame, customer: &str) -> Result<Vec<CustomerMetrics>, RfvError> {
    let ids = rfv.column(customer)?.as_materialized_series().str()?;
    let recency = rfv.column(RECENCY)?.as_materialized_series().i64()?;
    let frequency = rfv.column(FREQUENCY)?.as_materialized_series().u32()?;
    let value = rfv.column(VALUE)?.as_materialized_series().f64()?;

    let metrics = ids
        .into_iter()
        .zip(recency)
        .zip(frequency)
        .zip(value)
        .map(|(((id, recency), frequency), value)| CustomerMetrics {
            customer_id: id.unwrap_or_default().to_string(),
            recency: recency.unwrap_or_default(),
            frequency: frequency.unwrap_or_default(),
            value: value.unwrap_or_default(),
        })
        .collect();
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn example_transactions() -> Vec<Transaction> {
        vec![
            Transaction::new("C1", date(2024, 1, 1), "T1", 100.0),
            Transaction::new("C1", date(2024, 1, 10), "T2", 100.0),
            Transaction::new("C2", date(2024, 1, 15), "T3", 10.0),
        ]
    }

    #[test]
    fn test_aggregate_example() {
        let metrics = aggregate_transactions(&example_transactions()).unwrap();

        assert_eq!(
            metrics,
            vec![
                CustomerMetrics {
                    customer_id: "C1".into(),
                    recency: 5,
                    frequency: 2,
                    value: 200.0,
                },
                CustomerMetrics {
                    customer_id: "C2".into(),
                    recency: 0,
                    frequency: 1,
                    value: 10.0,
                },
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_no_metrics() {
        let metrics = aggregate_transactions(&[]).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_invariants_hold() {
        let mut transactions = example_transactions();
        transactions.push(Transaction::new("C3", date(2023, 6, 1), "T4", -20.0));
        transactions.push(Transaction::new("C3", date(2023, 6, 1), "T5", 5.0));

        let metrics = aggregate_transactions(&transactions).unwrap();
        assert_eq!(metrics.len(), 3);
        for m in &metrics {
            assert!(m.recency >= 0);
            assert!(m.frequency >= 1);
        }

        let c3 = metrics.iter().find(|m| m.customer_id == "C3").unwrap();
        assert_eq!(c3.frequency, 2);
        assert_eq!(c3.value, -15.0);
        assert_eq!(c3.recency, 228);
    }

    #[test]
    fn test_metric_accessor() {
        let m = CustomerMetrics {
            customer_id: "C1".into(),
            recency: 5,
            frequency: 2,
            value: 200.0,
        };
        assert_eq!(m.get(Metric::Recency), 5.0);
        assert_eq!(m.get(Metric::Frequency), 2.0);
        assert_eq!(m.get(Metric::Value), 200.0);
    }
}
