//! Quantile binning of numeric series
//!
//! Cut points are the `k / num_bins` quantiles of the non-missing values.
//! Equal cut points collapse, so a skewed series may get fewer bins than
//! asked for. Intervals are right-closed; the first one also holds the
//! minimum.
//!
//! Labels read `NN (lower, upper] - P.P%`. The zero-padded index makes the
//! lexicographic order of labels match the numeric order of the bins.

use serde::Serialize;

use super::errors::{AggregateError, AggregateResult};
use super::stats::{quantile_sorted, sorted_finite};

/// Default number of bins.
pub const DEFAULT_NUM_BINS: usize = 8;

/// Largest bin count whose index still fits the two-digit label prefix.
pub const MAX_NUM_BINS: usize = 99;

/// Decimal precision of interval edges in labels.
const EDGE_PRECISION: i32 = 2;

/// One bin of a binned series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    /// 1-based, increasing with the interval
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// Share of all non-missing rows, in percent
    pub percent: f64,
    pub label: String,
}

/// A numeric series mapped onto bin labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedSeries {
    /// Bin label per input row; `None` where the input was missing
    pub labels: Vec<Option<String>>,
    pub bins: Vec<Bin>,
}

impl BinnedSeries {
    pub fn bin_labels(&self) -> Vec<&str> {
        self.bins.iter().map(|b| b.label.as_str()).collect()
    }
}

/// Bins `values` into at most `num_bins` quantile bins.
///
/// # Errors
///
/// `EmptyInput` if no value is finite, `InvalidBinCount` if `num_bins` is
/// outside `1..=99`.
pub fn bin(values: &[Option<f64>], num_bins: usize) -> AggregateResult<BinnedSeries> {
    if num_bins == 0 || num_bins > MAX_NUM_BINS {
        return Err(AggregateError::InvalidBinCount(num_bins));
    }

    let sorted = sorted_finite(values.iter().flatten().copied());
    if sorted.is_empty() {
        return Err(AggregateError::EmptyInput(
            "series has no non-missing values".to_string(),
        ));
    }

    let edges = cut_points(&sorted, num_bins);
    let bin_count = edges.len() - 1;

    let mut counts = vec![0usize; bin_count];
    let assigned: Vec<Option<usize>> = values
        .iter()
        .map(|v| {
            let idx = (*v).filter(|x| x.is_finite()).map(|x| bin_index(&edges, x))?;
            counts[idx] += 1;
            Some(idx)
        })
        .collect();

    let total = sorted.len() as f64;
    let intervals = interval_texts(&edges);
    let bins: Vec<Bin> = (0..bin_count)
        .map(|i| {
            let percent = counts[i] as f64 * 100.0 / total;
            Bin {
                index: i + 1,
                lower: edges[i],
                upper: edges[i + 1],
                count: counts[i],
                percent,
                label: format!("{:02} {} - {:.1}%", i + 1, intervals[i], percent),
            }
        })
        .collect();

    let labels = assigned
        .into_iter()
        .map(|idx| idx.map(|i| bins[i].label.clone()))
        .collect();

    Ok(BinnedSeries { labels, bins })
}

/// Unique quantile cut points. A constant series keeps two equal edges so
/// that it still forms one bin.
fn cut_points(sorted: &[f64], num_bins: usize) -> Vec<f64> {
    let mut edges: Vec<f64> = (0..=num_bins)
        .filter_map(|k| quantile_sorted(sorted, k as f64 / num_bins as f64))
        .collect();
    edges.dedup();
    if edges.len() == 1 {
        edges.push(edges[0]);
    }
    edges
}

/// Right-closed interval lookup; the minimum falls into the first bin.
fn bin_index(edges: &[f64], x: f64) -> usize {
    let last = edges.len() - 2;
    (0..=last)
        .find(|&i| x <= edges[i + 1])
        .unwrap_or(last)
}

/// Interval descriptions with edges rounded just far enough to stay
/// distinct, and the lowest edge nudged down so the minimum reads inside.
fn interval_texts(edges: &[f64]) -> Vec<String> {
    let precision = (EDGE_PRECISION..20)
        .find(|&p| {
            let rounded: Vec<f64> = edges.iter().map(|&e| round_frac(e, p)).collect();
            rounded.windows(2).all(|w| w[0] != w[1]) || edges.len() == 2
        })
        .unwrap_or(EDGE_PRECISION);

    let mut shown: Vec<f64> = edges.iter().map(|&e| round_frac(e, precision)).collect();
    shown[0] -= 10f64.powi(-precision);

    shown
        .windows(2)
        .map(|w| format!("({}, {}]", float_repr(w[0]), float_repr(w[1])))
        .collect()
}

/// Rounds to `precision` significant decimals past the leading zeros of a
/// pure fraction, or `precision` decimals otherwise.
fn round_frac(x: f64, precision: i32) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    let digits = if x.trunc() == 0.0 {
        -(x.fract().abs().log10().floor() as i32) - 1 + precision
    } else {
        precision
    };
    round_to(x, digits)
}

fn round_to(x: f64, digits: i32) -> f64 {
    if digits >= 0 {
        format!("{:.*}", digits as usize, x).parse().unwrap_or(x)
    } else {
        let scale = 10f64.powi(-digits);
        (x / scale).round() * scale
    }
}

/// Shortest round-trip text; integral values keep a trailing `.0`.
fn float_repr(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_integer_series_bins() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let binned = bin(&series(&values), 8).unwrap();

        assert_eq!(binned.bins.len(), 8);
        assert_eq!(binned.bins[0].count, 2);
        assert_eq!(binned.bins[0].label, "01 (0.99, 2.0] - 22.2%");
        assert_eq!(binned.bins[7].label, "08 (8.0, 9.0] - 11.1%");
        assert_eq!(binned.labels[0].as_deref(), Some(binned.bins[0].label.as_str()));
        assert_eq!(binned.labels[8].as_deref(), Some(binned.bins[7].label.as_str()));
    }

    #[test]
    fn test_duplicate_cut_points_collapse() {
        let binned = bin(&series(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0]), 4).unwrap();
        assert!(binned.bins.len() < 4);
        let total: usize = binned.bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_constant_series_single_bin() {
        let binned = bin(&series(&[3.0, 3.0, 3.0]), 8).unwrap();
        assert_eq!(binned.bins.len(), 1);
        assert_eq!(binned.bins[0].label, "01 (2.99, 3.0] - 100.0%");
    }

    #[test]
    fn test_missing_rows_stay_missing() {
        let binned = bin(&[Some(1.0), None, Some(2.0), Some(f64::NAN)], 2).unwrap();
        assert!(binned.labels[1].is_none());
        assert!(binned.labels[3].is_none());
        let total: f64 = binned.bins.iter().map(|b| b.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(bin(&[], 8), Err(AggregateError::EmptyInput(_))));
        assert!(matches!(bin(&[None, None], 8), Err(AggregateError::EmptyInput(_))));
    }

    #[test]
    fn test_bin_count_bounds() {
        assert_eq!(bin(&[Some(1.0)], 0), Err(AggregateError::InvalidBinCount(0)));
        assert_eq!(bin(&[Some(1.0)], 100), Err(AggregateError::InvalidBinCount(100)));
    }

    #[test]
    fn test_round_frac() {
        assert_eq!(round_frac(0.001234, 2), 0.0012);
        assert_eq!(round_frac(12.3456, 2), 12.35);
        assert_eq!(round_frac(0.0, 2), 0.0);
    }
}
