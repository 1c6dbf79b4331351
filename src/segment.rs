//! Quartile thresholds and A-D band classification
//!
//! Each metric is split at its 25th, 50th and 75th percentile into the
//! intervals `(-inf, Q25]`, `(Q25, Q50]`, `(Q50, Q75]` and `(Q75, inf)`.
//! Recency ranks the lowest interval best (`A`); frequency and value rank
//! the highest interval best.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::RfvError;
use crate::metrics::{CustomerMetrics, FREQUENCY, RECENCY, VALUE};

/// Quartile band, `A` best through `D` worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    A,
    B,
    C,
    D,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::A, Band::B, Band::C, Band::D];

    pub fn as_char(self) -> char {
        match self {
            Band::A => 'A',
            Band::B => 'B',
            Band::C => 'C',
            Band::D => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Band::A),
            'B' => Some(Band::B),
            'C' => Some(Band::C),
            'D' => Some(Band::D),
            _ => None,
        }
    }

    /// Position in `ALL`, 0 for `A`
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Recency,
    Frequency,
    Value,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Value];

    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Recency => RECENCY,
            Metric::Frequency => FREQUENCY,
            Metric::Value => VALUE,
        }
    }

    pub fn band_column(self) -> &'static str {
        match self {
            Metric::Recency => "R_quartil",
            Metric::Frequency => "F_quartil",
            Metric::Value => "V_quartil",
        }
    }

    pub fn lower_is_better(self) -> bool {
        matches!(self, Metric::Recency)
    }
}

/// 25th, 50th and 75th percentile of one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
}

impl Quartiles {
    /// Quartiles with linear interpolation between closest ranks.
    /// Returns `None` for an empty input.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut sorted: Vec<f64> = values.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            q25: quantile_sorted(&sorted, 0.25),
            q50: quantile_sorted(&sorted, 0.50),
            q75: quantile_sorted(&sorted, 0.75),
        })
    }

    pub fn band(&self, value: f64, metric: Metric) -> Band {
        let interval = if value <= self.q25 {
            0
        } else if value <= self.q50 {
            1
        } else if value <= self.q75 {
            2
        } else {
            3
        };

        if metric.lower_is_better() {
            Band::ALL[interval]
        } else {
            Band::ALL[3 - interval]
        }
    }
}

// `sorted` must be non-empty and ascending.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Quartiles of every metric over one dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuartileThresholds {
    pub recency: Quartiles,
    pub frequency: Quartiles,
    pub value: Quartiles,
}

impl QuartileThresholds {
    pub fn compute(metrics: &[CustomerMetrics]) -> Result<Self, RfvError> {
        let quartiles = |metric: Metric| {
            Quartiles::from_values(metrics.iter().map(|m| m.get(metric)))
                .ok_or(RfvError::EmptyDataset)
        };

        let thresholds = Self {
            recency: quartiles(Metric::Recency)?,
            frequency: quartiles(Metric::Frequency)?,
            value: quartiles(Metric::Value)?,
        };
        debug!(?thresholds, customers = metrics.len(), "computed quartiles");
        Ok(thresholds)
    }

    pub fn get(&self, metric: Metric) -> &Quartiles {
        match metric {
            Metric::Recency => &self.recency,
            Metric::Frequency => &self.frequency,
            Metric::Value => &self.value,
        }
    }
}

/// Band of a single metric value against the dataset thresholds
pub fn classify(value: f64, metric: Metric, thresholds: &QuartileThresholds) -> Band {
    thresholds.get(metric).band(value, metric)
}

/// Bands of one customer, rendered as `R`, `F`, `V` characters (e.g. `"AAB"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RfvScore {
    pub recency: Band,
    pub frequency: Band,
    pub value: Band,
}

impl RfvScore {
    pub fn new(recency: Band, frequency: Band, value: Band) -> Self {
        Self {
            recency,
            frequency,
            value,
        }
    }

    pub fn from_values(
        recency: f64,
        frequency: f64,
        value: f64,
        thresholds: &QuartileThresholds,
    ) -> Self {
        Self::new(
            classify(recency, Metric::Recency, thresholds),
            classify(frequency, Metric::Frequency, thresholds),
            classify(value, Metric::Value, thresholds),
        )
    }

    pub fn of_customer(metrics: &CustomerMetrics, thresholds: &QuartileThresholds) -> Self {
        Self::from_values(
            metrics.get(Metric::Recency),
            metrics.get(Metric::Frequency),
            metrics.get(Metric::Value),
            thresholds,
        )
    }

    pub fn band(&self, metric: Metric) -> Band {
        match metric {
            Metric::Recency => self.recency,
            Metric::Frequency => self.frequency,
            Metric::Value => self.value,
        }
    }

    /// All 64 scores in lexical order
    pub fn all() -> impl Iterator<Item = RfvScore> {
        Band::ALL.into_iter().flat_map(|r| {
            Band::ALL
                .into_iter()
                .flat_map(move |f| Band::ALL.into_iter().map(move |v| RfvScore::new(r, f, v)))
        })
    }
}

impl fmt::Display for RfvScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.recency, self.frequency, self.value)
    }
}

impl FromStr for RfvScore {
    type Err = RfvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bands: Vec<Band> = s
            .chars()
            .map(Band::from_char)
            .collect::<Option<_>>()
            .unwrap_or_default();
        match bands.as_slice() {
            [r, f, v] => Ok(RfvScore::new(*r, *f, *v)),
            _ => Err(RfvError::InvalidScore(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, recency: i64, frequency: u32, value: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            recency,
            frequency,
            value,
        }
    }

    fn quartiles(q25: f64, q50: f64, q75: f64) -> Quartiles {
        Quartiles { q25, q50, q75 }
    }

    #[test]
    fn test_linear_quantiles() {
        let q = Quartiles::from_values([4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(q, quartiles(2.0, 3.0, 4.0));

        let q = Quartiles::from_values([0.0, 5.0]).unwrap();
        assert_eq!(q, quartiles(1.25, 2.5, 3.75));

        let q = Quartiles::from_values([7.0]).unwrap();
        assert_eq!(q, quartiles(7.0, 7.0, 7.0));

        assert!(Quartiles::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_recency_bands_are_closed_on_the_right() {
        let q = quartiles(10.0, 20.0, 30.0);
        assert_eq!(q.band(0.0, Metric::Recency), Band::A);
        assert_eq!(q.band(10.0, Metric::Recency), Band::A);
        assert_eq!(q.band(10.5, Metric::Recency), Band::B);
        assert_eq!(q.band(20.0, Metric::Recency), Band::B);
        assert_eq!(q.band(30.0, Metric::Recency), Band::C);
        assert_eq!(q.band(30.1, Metric::Recency), Band::D);
    }

    #[test]
    fn test_frequency_and_value_bands_are_reversed() {
        let q = quartiles(10.0, 20.0, 30.0);
        for metric in [Metric::Frequency, Metric::Value] {
            assert_eq!(q.band(10.0, metric), Band::D);
            assert_eq!(q.band(15.0, metric), Band::C);
            assert_eq!(q.band(30.0, metric), Band::B);
            assert_eq!(q.band(31.0, metric), Band::A);
        }
    }

    #[test]
    fn test_zero_variance_metric() {
        let metrics: Vec<_> = (0..5)
            .map(|i| customer(&format!("C{i}"), i, 3, 50.0))
            .collect();
        let thresholds = QuartileThresholds::compute(&metrics).unwrap();

        for m in &metrics {
            let score = RfvScore::of_customer(m, &thresholds);
            assert_eq!(score.frequency, Band::D);
            assert_eq!(score.value, Band::D);
        }
    }

    #[test]
    fn test_empty_metrics_is_an_error() {
        let err = QuartileThresholds::compute(&[]).unwrap_err();
        assert!(matches!(err, RfvError::EmptyDataset));
    }

    #[test]
    fn test_recency_is_monotonic() {
        let metrics: Vec<_> = [0, 3, 3, 8, 15, 40, 41, 90]
            .iter()
            .enumerate()
            .map(|(i, &r)| customer(&format!("C{i}"), r, 2, 10.0))
            .collect();
        let thresholds = QuartileThresholds::compute(&metrics).unwrap();

        for a in &metrics {
            for b in &metrics {
                if a.recency < b.recency {
                    let band_a = classify(a.recency as f64, Metric::Recency, &thresholds);
                    let band_b = classify(b.recency as f64, Metric::Recency, &thresholds);
                    assert!(band_a <= band_b);
                }
            }
        }
    }

    #[test]
    fn test_score_display_and_parse() {
        let score = RfvScore::new(Band::D, Band::A, Band::A);
        assert_eq!(score.to_string(), "DAA");
        assert_eq!("DAA".parse::<RfvScore>().unwrap(), score);

        assert!("DA".parse::<RfvScore>().is_err());
        assert!("DAAA".parse::<RfvScore>().is_err());
        assert!("DAE".parse::<RfvScore>().is_err());
        assert!("daa".parse::<RfvScore>().is_err());
    }

    #[test]
    fn test_all_scores() {
        let scores: Vec<_> = RfvScore::all().collect();
        assert_eq!(scores.len(), 64);
        assert_eq!(scores[0].to_string(), "AAA");
        assert_eq!(scores[63].to_string(), "DDD");
        for score in scores {
            let text = score.to_string();
            assert_eq!(text.len(), 3);
            assert!(text.chars().all(|c| Band::from_char(c).is_some()));
        }
    }
}
