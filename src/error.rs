//! Error type for the RFV engine and the data loaders.

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RfvError {
    /// A column the pipeline needs is not present in the input.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// `row` is the 1-based data row of the input file.
    #[error("invalid date '{value}' in column '{column}' at row {row}")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column '{column}' is not numeric: {reason}")]
    InvalidAmount { column: String, reason: String },

    /// Quantiles of an empty set are undefined.
    #[error("no data: the dataset contains no rows")]
    EmptyDataset,

    #[error("invalid RFV score '{0}': expected 3 characters from A-D")]
    InvalidScore(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

impl RfvError {
    /// True for errors caused by a malformed input file.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RfvError::MissingColumn(_) | RfvError::InvalidDate { .. } | RfvError::InvalidAmount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_family() {
        assert!(RfvError::MissingColumn("DiaCompra".into()).is_input_error());
        assert!(RfvError::InvalidDate {
            column: "DiaCompra".into(),
            row: 3,
            value: "yesterday".into(),
        }
        .is_input_error());
        assert!(!RfvError::EmptyDataset.is_input_error());
        assert!(!RfvError::InvalidScore("XYZ".into()).is_input_error());
    }

    #[test]
    fn messages_name_the_column() {
        let err = RfvError::MissingColumn("ValorTotal".into());
        assert_eq!(err.to_string(), "missing required column 'ValorTotal'");
    }
}
