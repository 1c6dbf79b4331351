//! RFV segmentation model: thresholds, per-customer scores and actions

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::actions::{ActionTable, ACTION_COLUMN};
use crate::error::RfvError;
use crate::metrics::{CustomerMetrics, FREQUENCY, RECENCY, VALUE};
use crate::segment::{Metric, QuartileThresholds, RfvScore};

pub const CUSTOMER_COLUMN: &str = "ID_cliente";
pub const SCORE_COLUMN: &str = "RFV_Score";

/// Result of classifying one set of RFV values
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub score: RfvScore,
    /// `None` when the score has no action
    pub action: Option<String>,
}

impl Classification {
    pub fn new(score: RfvScore, actions: &ActionTable) -> Self {
        Self {
            score,
            action: actions.lookup(&score).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedCustomer {
    pub metrics: CustomerMetrics,
    pub classification: Classification,
}

/// Segmented customers together with the thresholds used to band them
#[derive(Debug, Clone)]
pub struct RfvTable {
    pub thresholds: QuartileThresholds,
    pub customers: Vec<SegmentedCustomer>,
}

/// Band every customer against the quartiles of the whole set and attach actions
///
/// # Arguments
/// * `metrics` - One entry per customer
/// * `actions` - Score to action mapping
///
/// # Returns
/// * `RfvTable` in the same customer order, or `EmptyDataset` when `metrics` is empty
pub fn segment_customers(
    metrics: Vec<CustomerMetrics>,
    actions: &ActionTable,
) -> Result<RfvTable, RfvError> {
    let thresholds = QuartileThresholds::compute(&metrics)?;

    let customers = metrics
        .into_iter()
        .map(|metrics| {
            let score = RfvScore::of_customer(&metrics, &thresholds);
            SegmentedCustomer {
                metrics,
                classification: Classification::new(score, actions),
            }
        })
        .collect();

    Ok(RfvTable {
        thresholds,
        customers,
    })
}

impl RfvTable {
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Customers per band of `metric`, indexed A..D
    pub fn band_counts(&self, metric: Metric) -> [usize; 4] {
        let mut counts = [0; 4];
        for customer in &self.customers {
            counts[customer.classification.score.band(metric).index()] += 1;
        }
        counts
    }

    /// Customers per score, most frequent first
    pub fn score_counts(&self) -> Vec<(RfvScore, usize)> {
        let mut counts: BTreeMap<RfvScore, usize> = BTreeMap::new();
        for customer in &self.customers {
            *counts.entry(customer.classification.score).or_default() += 1;
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }

    /// Customers per action, missing actions included, most frequent first.
    /// Ties are ordered by action text with the missing action last.
    pub fn action_counts(&self) -> Vec<(Option<String>, usize)> {
        let mut counts: BTreeMap<Option<String>, usize> = BTreeMap::new();
        for customer in &self.customers {
            *counts
                .entry(customer.classification.action.clone())
                .or_default() += 1;
        }

        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.0.is_none().cmp(&b.0.is_none()))
                .then(a.0.cmp(&b.0))
        });
        counts
    }

    /// Up to `limit` customers with `score`, highest value first
    pub fn top_customers(&self, score: RfvScore, limit: usize) -> Vec<&SegmentedCustomer> {
        let mut matching: Vec<_> = self
            .customers
            .iter()
            .filter(|c| c.classification.score == score)
            .collect();
        matching.sort_by(|a, b| b.metrics.value.total_cmp(&a.metrics.value));
        matching.truncate(limit);
        matching
    }

    /// Classify values that are not part of the table against its thresholds
    pub fn classify_values(
        &self,
        recency: f64,
        frequency: f64,
        value: f64,
        actions: &ActionTable,
    ) -> Classification {
        let score = RfvScore::from_values(recency, frequency, value, &self.thresholds);
        Classification::new(score, actions)
    }

    /// Output table, one row per customer
    pub fn to_dataframe(&self) -> Result<DataFrame, RfvError> {
        let customers = &self.customers;
        let band = |metric: Metric| -> Vec<String> {
            customers
                .iter()
                .map(|c| c.classification.score.band(metric).to_string())
                .collect()
        };

        let ids: Vec<&str> = customers.iter().map(|c| c.metrics.customer_id.as_str()).collect();
        let recency: Vec<i64> = customers.iter().map(|c| c.metrics.recency).collect();
        let frequency: Vec<u32> = customers.iter().map(|c| c.metrics.frequency).collect();
        let value: Vec<f64> = customers.iter().map(|c| c.metrics.value).collect();
        let scores: Vec<String> = customers
            .iter()
            .map(|c| c.classification.score.to_string())
            .collect();
        let actions: Vec<Option<&str>> = customers
            .iter()
            .map(|c| c.classification.action.as_deref())
            .collect();

        let df = DataFrame::new(vec![
            Series::new(CUSTOMER_COLUMN.into(), ids).into(),
            Series::new(RECENCY.into(), recency).into(),
            Series::new(FREQUENCY.into(), frequency).into(),
            Series::new(VALUE.into(), value).into(),
            Series::new(Metric::Recency.band_column().into(), band(Metric::Recency)).into(),
            Series::new(Metric::Frequency.band_column().into(), band(Metric::Frequency)).into(),
            Series::new(Metric::Value.band_column().into(), band(Metric::Value)).into(),
            Series::new(SCORE_COLUMN.into(), scores).into(),
            Series::new(ACTION_COLUMN.into(), actions).into(),
        ])?;
        Ok(df)
    }
}

/// Output column names in export order
pub fn output_columns() -> [&'static str; 9] {
    [
        CUSTOMER_COLUMN,
        RECENCY,
        FREQUENCY,
        VALUE,
        Metric::Recency.band_column(),
        Metric::Frequency.band_column(),
        Metric::Value.band_column(),
        SCORE_COLUMN,
        ACTION_COLUMN,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Band;

    fn customer(id: &str, recency: i64, frequency: u32, value: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            recency,
            frequency,
            value,
        }
    }

    fn create_test_metrics() -> Vec<CustomerMetrics> {
        vec![
            customer("1", 1, 10, 1000.0),
            customer("2", 5, 8, 800.0),
            customer("3", 20, 3, 300.0),
            customer("4", 40, 2, 150.0),
            customer("5", 90, 1, 20.0),
            customer("6", 120, 1, 10.0),
            customer("7", 3, 9, 950.0),
            customer("8", 60, 1, 15.0),
        ]
    }

    #[test]
    fn test_two_customer_example() {
        let metrics = vec![customer("C1", 5, 2, 200.0), customer("C2", 0, 1, 10.0)];
        let table = segment_customers(metrics, &ActionTable::default()).unwrap();

        let c1 = &table.customers[0].classification;
        let c2 = &table.customers[1].classification;
        assert_eq!(c1.score.to_string(), "DAA");
        assert_eq!(c2.score.to_string(), "ADD");
        assert!(c2.score.recency <= c1.score.recency);
        assert!(c1.score.frequency <= c2.score.frequency);
        assert!(c1.score.value <= c2.score.value);

        assert_eq!(
            c1.action.as_deref(),
            ActionTable::default().lookup_str("DAA")
        );
        assert_eq!(c2.action, None);
    }

    #[test]
    fn test_action_count_ties_put_missing_action_last() {
        let metrics = vec![customer("C1", 5, 2, 200.0), customer("C2", 0, 1, 10.0)];
        let table = segment_customers(metrics, &ActionTable::default()).unwrap();

        let churn = ActionTable::default().lookup_str("DAA").map(str::to_string);
        assert_eq!(table.action_counts(), vec![(churn, 1), (None, 1)]);
    }

    #[test]
    fn test_empty_metrics() {
        let result = segment_customers(Vec::new(), &ActionTable::default());
        assert!(matches!(result, Err(RfvError::EmptyDataset)));
    }

    #[test]
    fn test_band_counts_cover_all_customers() {
        let table = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();
        for metric in Metric::ALL {
            let counts = table.band_counts(metric);
            assert_eq!(counts.iter().sum::<usize>(), table.len());
        }
    }

    #[test]
    fn test_best_customers_score_aaa() {
        let table = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();

        let best = table.top_customers("AAA".parse().unwrap(), 10);
        let ids: Vec<_> = best.iter().map(|c| c.metrics.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "7"]);
        assert!(best.iter().all(|c| c.classification.action.is_some()));

        let worst = table.customers.iter().find(|c| c.metrics.customer_id == "6").unwrap();
        assert_eq!(worst.classification.score.to_string(), "DDD");
    }

    #[test]
    fn test_score_and_action_counts() {
        let table = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();

        let scores = table.score_counts();
        assert_eq!(scores.iter().map(|(_, n)| n).sum::<usize>(), 8);
        assert!(scores.windows(2).all(|w| w[0].1 >= w[1].1));

        let actions = table.action_counts();
        assert_eq!(actions.iter().map(|(_, n)| n).sum::<usize>(), 8);
        assert!(actions.iter().any(|(action, _)| action.is_none()));
    }

    #[test]
    fn test_classify_values() {
        let table = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();

        let classification = table.classify_values(0.0, 50.0, 5000.0, &ActionTable::default());
        assert_eq!(classification.score, RfvScore::new(Band::A, Band::A, Band::A));
        assert!(classification.action.is_some());

        let classification = table.classify_values(500.0, 1.0, 1.0, &ActionTable::default());
        assert_eq!(classification.score.to_string(), "DDD");
    }

    #[test]
    fn test_recomputing_is_deterministic() {
        let first = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();
        let second = segment_customers(create_test_metrics(), &ActionTable::default()).unwrap();
        assert_eq!(first.customers, second.customers);
    }

    #[test]
    fn test_to_dataframe() {
        let metrics = vec![customer("C1", 5, 2, 200.0), customer("C2", 0, 1, 10.0)];
        let table = segment_customers(metrics, &ActionTable::default()).unwrap();

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 9));

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, output_columns().map(String::from).to_vec());

        let actions = df.column(ACTION_COLUMN).unwrap();
        assert_eq!(actions.null_count(), 1);
    }
}
