use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::config::{McConfig, McDistribution};
use crate::error::SteelDcfError;
use crate::SteelDcfResult;

/// Keeps probabilities away from 0 and 1 so normal quantiles stay finite.
const PROBABILITY_CLAMP: f64 = 1e-12;
const CHOLESKY_TOLERANCE: f64 = 1e-10;

/// Sampled inputs: one row per draw, one column per configured variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl DesignMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }
}

/// Stratified uniforms: each column holds exactly one draw in every
/// interval `[i/n, (i+1)/n)`, in random order.
pub fn latin_hypercube(n: usize, k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut rows = vec![vec![0.0_f64; k]; n];
    let mut strata: Vec<usize> = (0..n).collect();
    for j in 0..k {
        strata.shuffle(rng);
        for (row, stratum) in rows.iter_mut().zip(&strata) {
            let jitter: f64 = rng.gen();
            row[j] = (*stratum as f64 + jitter) / n as f64;
        }
    }
    rows
}

/// Lower Cholesky factor of a correlation matrix, tolerating a
/// positive-semidefinite (singular) input. Returns `None` if the matrix is
/// not square or has a materially negative pivot.
pub fn cholesky_lower_psd(matrix: &[Vec<f64>], tol: f64) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    if n == 0 || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut l = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum < -tol {
                    return None;
                }
                l[i][j] = sum.max(0.0).sqrt();
            } else if l[j][j] > tol {
                l[i][j] = sum / l[j][j];
            }
        }
    }
    Some(l)
}

/// `out = L * z` for a lower-triangular `L`.
pub fn correlate_normals(chol: &[Vec<f64>], z: &[f64], out: &mut [f64]) {
    for (i, row) in chol.iter().enumerate() {
        out[i] = row.iter().zip(z).take(i + 1).map(|(l, x)| l * x).sum();
    }
}

/// Marginal quantile of `dist` at probability `u`.
pub fn inverse_cdf(dist: &McDistribution, u: f64, standard: &Normal) -> f64 {
    let u = u.clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP);
    match *dist {
        McDistribution::Normal { mean, std_dev } => mean + std_dev * standard.inverse_cdf(u),
        McDistribution::LogNormal { mu, sigma } => (mu + sigma * standard.inverse_cdf(u)).exp(),
        McDistribution::Triangular { min, mode, max } => {
            let width = max - min;
            let split = (mode - min) / width;
            if u < split {
                min + (u * width * (mode - min)).sqrt()
            } else {
                max - ((1.0 - u) * width * (max - mode)).sqrt()
            }
        }
        McDistribution::Uniform { min, max } => min + u * (max - min),
    }
}

/// Draw the full design for `n` samples from a single seeded stream.
///
/// LHS uniforms are mapped to standard normals, correlated with the
/// Cholesky factor of the configured matrix, mapped back to uniforms and
/// pushed through each marginal's inverse CDF.
pub fn sample_design(config: &McConfig, n: usize, seed: u64) -> SteelDcfResult<DesignMatrix> {
    config.validate()?;
    if n == 0 {
        return Err(SteelDcfError::invalid("n_samples", "Must be at least 1"));
    }

    let correlation = config.correlation_matrix()?;
    let chol = cholesky_lower_psd(&correlation, CHOLESKY_TOLERANCE).ok_or_else(|| {
        SteelDcfError::invalid("correlations", "Correlation matrix is not positive semidefinite")
    })?;
    let standard = Normal::new(0.0, 1.0).map_err(|e| SteelDcfError::Distribution {
        variable: "standard_normal".into(),
        reason: e.to_string(),
    })?;

    let k = config.variables.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let uniforms = latin_hypercube(n, k, &mut rng);

    let mut z = vec![0.0_f64; k];
    let mut correlated = vec![0.0_f64; k];
    let rows = uniforms
        .iter()
        .map(|u_row| {
            for (zi, u) in z.iter_mut().zip(u_row) {
                *zi = standard.inverse_cdf(u.clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP));
            }
            correlate_normals(&chol, &z, &mut correlated);
            config
                .variables
                .iter()
                .zip(&correlated)
                .map(|(v, c)| inverse_cdf(&v.distribution, standard.cdf(*c), &standard))
                .collect()
        })
        .collect();

    Ok(DesignMatrix {
        names: config.variables.iter().map(|v| v.name.clone()).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monte_carlo::config::{McCorrelation, McTarget, McVariable};

    fn standard() -> Normal {
        Normal::new(0.0, 1.0).unwrap()
    }

    fn pearson(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len() as f64;
        let ma = a.iter().sum::<f64>() / n;
        let mb = b.iter().sum::<f64>() / n;
        let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
        let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
        let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
        cov / (va.sqrt() * vb.sqrt())
    }

    fn two_normals(rho: f64) -> McConfig {
        let normal = McDistribution::Normal {
            mean: 0.0,
            std_dev: 1.0,
        };
        McConfig {
            variables: vec![
                McVariable {
                    name: "a".into(),
                    target: McTarget::DomesticWacc,
                    distribution: normal.clone(),
                },
                McVariable {
                    name: "b".into(),
                    target: McTarget::TargetRiskFree,
                    distribution: normal,
                },
            ],
            correlations: vec![McCorrelation {
                first: "a".into(),
                second: "b".into(),
                rho,
            }],
        }
    }

    #[test]
    fn test_lhs_one_draw_per_stratum() {
        let n = 40;
        let mut rng = StdRng::seed_from_u64(7);
        let rows = latin_hypercube(n, 3, &mut rng);
        for j in 0..3 {
            let mut strata: Vec<usize> = rows.iter().map(|r| (r[j] * n as f64) as usize).collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_cholesky_two_by_two() {
        let l = cholesky_lower_psd(&[vec![1.0, 0.8], vec![0.8, 1.0]], 1e-12).unwrap();
        assert!((l[1][0] - 0.8).abs() < 1e-12);
        assert!((l[1][1] - 0.6).abs() < 1e-12);
        assert_eq!(l[0][1], 0.0);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let m = vec![
            vec![1.0, 0.9, -0.9],
            vec![0.9, 1.0, 0.9],
            vec![-0.9, 0.9, 1.0],
        ];
        assert!(cholesky_lower_psd(&m, 1e-10).is_none());
    }

    #[test]
    fn test_triangular_quantiles() {
        let d = McDistribution::Triangular {
            min: 0.0,
            mode: 0.5,
            max: 1.0,
        };
        let s = standard();
        assert!((inverse_cdf(&d, 0.5, &s) - 0.5).abs() < 1e-9);
        assert!(inverse_cdf(&d, 0.01, &s) >= 0.0);
        assert!(inverse_cdf(&d, 0.99, &s) <= 1.0);
    }

    #[test]
    fn test_lognormal_median() {
        let d = McDistribution::LogNormal {
            mu: 0.0,
            sigma: 0.2,
        };
        assert!((inverse_cdf(&d, 0.5, &standard()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_design_reproducible() {
        let config = McConfig::reference();
        let a = sample_design(&config, 64, 42).unwrap();
        let b = sample_design(&config, 64, 42).unwrap();
        let c = sample_design(&config, 64, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.names.len(), 30);
    }

    #[test]
    fn test_target_correlation_recovered() {
        let design = sample_design(&two_normals(0.8), 2000, 11).unwrap();
        let r = pearson(&design.column(0), &design.column(1));
        assert!((r - 0.8).abs() < 0.05, "sample correlation {r}");
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(sample_design(&McConfig::reference(), 0, 1).is_err());
    }
}
