//! RfvForge: customer segmentation by Recency, Frequency and Value quartiles
//!
//! Transactions are aggregated per customer, each metric is split into
//! quartile bands A-D, and the three bands form a score that selects a
//! marketing action. A second report renders descriptive charts for
//! SINASC natality data.

pub mod actions;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model;
pub mod natality;
pub mod segment;
pub mod viz;

// Re-export public items for easier access
pub use actions::ActionTable;
pub use cli::Args;
pub use config::Settings;
pub use data::{load_transactions, ColumnMap, DateRange, Transaction};
pub use error::RfvError;
pub use metrics::{aggregate_frame, aggregate_transactions, CustomerMetrics};
pub use model::{segment_customers, Classification, RfvTable, SegmentedCustomer};
pub use segment::{classify, Band, Metric, QuartileThresholds, Quartiles, RfvScore};

/// Common result type for the binary and the output sinks
pub type Result<T> = anyhow::Result<T>;
