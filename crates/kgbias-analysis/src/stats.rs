//! Summary statistics over error samples.
//!
//! Two families:
//! - [`DeltaStats`]: unsigned centrality gaps `|c(true) - c(pred)|`
//! - [`SignedStats`]: `c(pred) - c(true)` and the share of predictions that
//!   are more central than the truth, classified into a [`BiasClass`]
//!
//! An empty slice is [`SliceStats::NoData`], never a zero-count statistic.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Above this share of "prediction more central" the run is `HIGH_CENTRALITY`.
pub const HIGH_CENTRALITY_PCT: f64 = 55.0;
/// Below this share the run is `LOW_CENTRALITY`.
pub const LOW_CENTRALITY_PCT: f64 = 45.0;
/// Cross-model spreads above this many percentage points are significant.
pub const SIGNIFICANCE_PP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SliceStats<T> {
    Measured(T),
    NoData,
}

impl<T> SliceStats<T> {
    pub fn measured(&self) -> Option<&T> {
        match self {
            SliceStats::Measured(v) => Some(v),
            SliceStats::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, SliceStats::NoData)
    }
}

impl<T> From<Option<T>> for SliceStats<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(SliceStats::NoData, SliceStats::Measured)
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasClass {
    HighCentrality,
    LowCentrality,
    Neutral,
}

impl BiasClass {
    pub fn classify(pct_pred_higher: f64) -> Self {
        if pct_pred_higher > HIGH_CENTRALITY_PCT {
            BiasClass::HighCentrality
        } else if pct_pred_higher < LOW_CENTRALITY_PCT {
            BiasClass::LowCentrality
        } else {
            BiasClass::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BiasClass::HighCentrality => "HIGH_CENTRALITY",
            BiasClass::LowCentrality => "LOW_CENTRALITY",
            BiasClass::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for BiasClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BiasClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH_CENTRALITY" => Ok(BiasClass::HighCentrality),
            "LOW_CENTRALITY" => Ok(BiasClass::LowCentrality),
            "NEUTRAL" => Ok(BiasClass::Neutral),
            other => Err(format!("unknown bias class `{other}`")),
        }
    }
}

// ============================================================================
// Unsigned deltas
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaStats {
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl DeltaStats {
    pub fn compute(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len();
        let avg = mean(samples.iter().copied(), n);
        let var = mean(samples.iter().map(|x| (x - avg) * (x - avg)), n);
        Some(Self {
            n,
            mean: avg,
            median: median(samples),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std: var.sqrt(),
        })
    }

    pub fn of(samples: &[f64]) -> SliceStats<Self> {
        Self::compute(samples).into()
    }
}

// ============================================================================
// Signed differences
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedStats {
    pub n: usize,
    pub mean_pr_real: f64,
    pub mean_pr_pred: f64,
    /// Mean of `pr_pred - pr_real`.
    pub signed_diff: f64,
    /// Mean of `|pr_pred - pr_real|`.
    pub abs_diff: f64,
    /// Share of samples with `pr_pred > pr_real`, in percent.
    pub pct_pred_higher: f64,
    pub bias: BiasClass,
}

impl SignedStats {
    /// `pairs` are `(pr_real, pr_pred)`.
    pub fn compute(pairs: &[(f64, f64)]) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }
        let n = pairs.len();
        let diffs: Vec<f64> = pairs.iter().map(|(real, pred)| pred - real).collect();
        let higher = diffs.iter().filter(|d| **d > 0.0).count();
        let pct_pred_higher = higher as f64 * 100.0 / n as f64;
        Some(Self {
            n,
            mean_pr_real: mean(pairs.iter().map(|p| p.0), n),
            mean_pr_pred: mean(pairs.iter().map(|p| p.1), n),
            signed_diff: mean(diffs.iter().copied(), n),
            abs_diff: mean(diffs.iter().map(|d| d.abs()), n),
            pct_pred_higher,
            bias: BiasClass::classify(pct_pred_higher),
        })
    }

    pub fn of(pairs: &[(f64, f64)]) -> SliceStats<Self> {
        Self::compute(pairs).into()
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    values.sum::<f64>() / n as f64
}

/// Middle value; mean of the two middle values for even counts.
fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn delta_stats_match_population_formulas() {
        let s = DeltaStats::compute(&[0.1, 0.4, 0.2, 0.3]).unwrap();
        assert_eq!(s.n, 4);
        assert_abs_diff_eq!(s.mean, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(s.median, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(s.max, 0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(s.std, 0.0125f64.sqrt(), epsilon = 1e-12);

        let odd = DeltaStats::compute(&[3.0, 1.0, 2.0]).unwrap();
        assert_abs_diff_eq!(odd.median, 2.0);
    }

    #[test]
    fn empty_slices_are_no_data() {
        assert!(DeltaStats::of(&[]).is_no_data());
        assert!(SignedStats::of(&[]).is_no_data());
    }

    #[test]
    fn signed_stats_count_strictly_higher_predictions() {
        // diffs: +0.2, -0.1, 0.0, +0.1
        let s = SignedStats::compute(&[(0.1, 0.3), (0.2, 0.1), (0.5, 0.5), (0.0, 0.1)]).unwrap();
        assert_abs_diff_eq!(s.pct_pred_higher, 50.0);
        assert_eq!(s.bias, BiasClass::Neutral);
        assert_abs_diff_eq!(s.signed_diff, 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(s.abs_diff, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean_pr_real, 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean_pr_pred, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(BiasClass::classify(55.0), BiasClass::Neutral);
        assert_eq!(BiasClass::classify(55.1), BiasClass::HighCentrality);
        assert_eq!(BiasClass::classify(45.0), BiasClass::Neutral);
        assert_eq!(BiasClass::classify(44.9), BiasClass::LowCentrality);
        assert_eq!("NEUTRAL".parse::<BiasClass>().unwrap(), BiasClass::Neutral);
    }

    proptest! {
        #[test]
        fn pct_is_a_percentage_and_class_follows_it(
            pairs in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0), 1..60)
        ) {
            let s = SignedStats::compute(&pairs).unwrap();
            prop_assert!((0.0..=100.0).contains(&s.pct_pred_higher));
            let expected = if s.pct_pred_higher > 55.0 {
                BiasClass::HighCentrality
            } else if s.pct_pred_higher < 45.0 {
                BiasClass::LowCentrality
            } else {
                BiasClass::Neutral
            };
            prop_assert_eq!(s.bias, expected);
        }

        #[test]
        fn median_lies_within_range(samples in prop::collection::vec(0.0f64..1.0, 1..50)) {
            let s = DeltaStats::compute(&samples).unwrap();
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            prop_assert!(s.median >= min && s.median <= s.max);
            prop_assert!(s.std >= 0.0);
        }
    }
}
