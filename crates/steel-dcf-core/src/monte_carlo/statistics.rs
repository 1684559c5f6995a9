use serde::{Deserialize, Serialize};

const HISTOGRAM_BINS: usize = 20;

/// Percentile summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

/// Distribution summary of one simulated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McOutputStatistics {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: McPercentiles,
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    pub histogram: Vec<HistogramBin>,
}

/// Linear-interpolated percentile of a **sorted** slice; NaN when empty.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = p / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] * (1.0 - frac) + sorted[upper] * frac
        }
    }
}

/// Equal-width bins over a non-empty sorted slice.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let (Some(&min_val), Some(&max_val)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }
    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }
    bins
}

/// Descriptive statistics; `None` for an empty sample.
pub fn compute_statistics(values: &[f64], name: &str) -> Option<McOutputStatistics> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len() as f64;

    let mean = sorted.iter().sum::<f64>() / n;
    let median = percentile_sorted(&sorted, 50.0);
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let (skewness, kurtosis) = if std_dev > f64::EPSILON {
        let m3 = sorted.iter().map(|v| ((v - mean) / std_dev).powi(3)).sum::<f64>() / n;
        let m4 = sorted.iter().map(|v| ((v - mean) / std_dev).powi(4)).sum::<f64>() / n;
        (m3, m4 - 3.0)
    } else {
        (0.0, 0.0)
    };

    Some(McOutputStatistics {
        name: name.to_string(),
        count: sorted.len(),
        mean,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles: McPercentiles {
            p5: percentile_sorted(&sorted, 5.0),
            p10: percentile_sorted(&sorted, 10.0),
            p25: percentile_sorted(&sorted, 25.0),
            p50: median,
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
        },
        skewness,
        kurtosis,
        histogram: build_histogram(&sorted, HISTOGRAM_BINS),
    })
}

/// Share of values strictly above `threshold`.
pub fn probability_above(values: &[f64], threshold: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| **v > threshold).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_of_one_to_hundred_one() {
        let v: Vec<f64> = (0..=100).map(f64::from).collect();
        assert_eq!(percentile_sorted(&v, 50.0), 50.0);
        assert!((percentile_sorted(&v, 5.0) - 5.0).abs() < 1e-9);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }

    #[test]
    fn test_statistics_of_symmetric_sample() {
        let stats = compute_statistics(&[1.0, 2.0, 3.0, 4.0, 5.0], "x").unwrap();
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert!(stats.skewness.abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        let total: u32 = stats.histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_constant_sample_single_bin() {
        let stats = compute_statistics(&[2.0; 10], "flat").unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.histogram.len(), 1);
        assert_eq!(stats.kurtosis, 0.0);
    }

    #[test]
    fn test_empty_sample() {
        assert!(compute_statistics(&[], "none").is_none());
        assert_eq!(probability_above(&[], 1.0), 0.0);
    }

    #[test]
    fn test_probability_above_is_strict() {
        assert_eq!(probability_above(&[1.0, 2.0, 3.0, 4.0], 2.0), 0.5);
    }
}
