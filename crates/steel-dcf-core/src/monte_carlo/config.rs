use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SteelDcfError;
use crate::market::{Benchmark, Segment, SegmentTable};
use crate::projection::capital_projects::ProjectCatalog;
use crate::types::decimal_to_f64;
use crate::SteelDcfResult;

/// Marginal distribution of one sampled input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McDistribution {
    Normal { mean: f64, std_dev: f64 },
    /// Parameters of the underlying normal: `exp(mu + sigma * z)`
    LogNormal { mu: f64, sigma: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
    Uniform { min: f64, max: f64 },
}

impl McDistribution {
    /// Lognormal with the given arithmetic mean of 1.0 and log-volatility.
    pub fn unit_lognormal(sigma: f64) -> Self {
        McDistribution::LogNormal {
            mu: -0.5 * sigma * sigma,
            sigma,
        }
    }

    pub fn validate(&self, variable: &str) -> SteelDcfResult<()> {
        let bad = |reason: &str| SteelDcfError::Distribution {
            variable: variable.to_string(),
            reason: reason.to_string(),
        };
        match *self {
            McDistribution::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || std_dev <= 0.0 {
                    return Err(bad("normal needs a finite mean and positive std_dev"));
                }
            }
            McDistribution::LogNormal { mu, sigma } => {
                if !mu.is_finite() || !sigma.is_finite() || sigma <= 0.0 {
                    return Err(bad("lognormal needs a finite mu and positive sigma"));
                }
            }
            McDistribution::Triangular { min, mode, max } => {
                if !(min.is_finite() && mode.is_finite() && max.is_finite()) {
                    return Err(bad("triangular bounds must be finite"));
                }
                if min >= max || mode < min || mode > max {
                    return Err(bad("triangular requires min <= mode <= max and min < max"));
                }
            }
            McDistribution::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite()) || min >= max {
                    return Err(bad("uniform requires finite min < max"));
                }
            }
        }
        Ok(())
    }
}

/// Scenario field a sampled value is written to.
///
/// Price and volume factors multiply the base scenario's factor; every other
/// target replaces the base value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum McTarget {
    PriceFactor(Benchmark),
    VolumeFactor(Segment),
    VolumeGrowth(Segment),
    /// Premium to benchmark for the segment
    Realization(Segment),
    /// Execution factor override for one named project
    ExecutionFactor(String),
    DomesticWacc,
    TerminalGrowth,
    ExitMultiple,
    PriceGrowth,
    HomeRiskFree,
    TargetRiskFree,
    HomeEquityRiskPremium,
    SynergyRealization,
    IntegrationCostMultiplier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McVariable {
    pub name: String,
    pub target: McTarget,
    pub distribution: McDistribution,
}

/// Pairwise rank-space correlation between two named variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McCorrelation {
    pub first: String,
    pub second: String,
    pub rho: f64,
}

/// Sampling configuration. Pairs not listed are uncorrelated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McConfig {
    pub variables: Vec<McVariable>,
    #[serde(default)]
    pub correlations: Vec<McCorrelation>,
}

impl McConfig {
    /// Thirty inputs spanning prices, volumes, realization, project
    /// execution, discount rates and synergy delivery.
    pub fn reference() -> Self {
        let mut variables = Vec::with_capacity(30);

        for benchmark in Benchmark::ALL {
            let sigma = match benchmark {
                Benchmark::Octg => 0.20,
                _ => 0.15,
            };
            variables.push(var(
                format!("price_factor.{}", benchmark.key()),
                McTarget::PriceFactor(benchmark),
                McDistribution::unit_lognormal(sigma),
            ));
        }
        for segment in Segment::ALL {
            variables.push(var(
                format!("volume_factor.{}", segment.key()),
                McTarget::VolumeFactor(segment),
                McDistribution::Normal {
                    mean: 1.0,
                    std_dev: 0.05,
                },
            ));
        }
        for segment in Segment::ALL {
            variables.push(var(
                format!("volume_growth.{}", segment.key()),
                McTarget::VolumeGrowth(segment),
                McDistribution::Normal {
                    mean: 0.0,
                    std_dev: 0.01,
                },
            ));
        }
        // Skewed to the downside around the reference premiums
        for (segment, config) in SegmentTable::reference().iter() {
            let premium = decimal_to_f64(config.premium_to_benchmark);
            variables.push(var(
                format!("realization.{}", segment.key()),
                McTarget::Realization(*segment),
                McDistribution::Triangular {
                    min: premium - 0.08,
                    mode: premium,
                    max: premium + 0.04,
                },
            ));
        }
        for project in ProjectCatalog::reference()
            .projects
            .values()
            .filter(|p| !p.baseline)
        {
            variables.push(var(
                format!("execution.{}", project.name),
                McTarget::ExecutionFactor(project.name.clone()),
                McDistribution::Triangular {
                    min: 0.5,
                    mode: 0.85,
                    max: 1.0,
                },
            ));
        }

        variables.extend([
            var(
                "domestic_wacc",
                McTarget::DomesticWacc,
                McDistribution::Normal {
                    mean: 0.107,
                    std_dev: 0.01,
                },
            ),
            var(
                "terminal_growth",
                McTarget::TerminalGrowth,
                McDistribution::Triangular {
                    min: 0.0,
                    mode: 0.01,
                    max: 0.02,
                },
            ),
            var(
                "exit_multiple",
                McTarget::ExitMultiple,
                McDistribution::Triangular {
                    min: 3.5,
                    mode: 4.5,
                    max: 6.0,
                },
            ),
            var(
                "price_growth",
                McTarget::PriceGrowth,
                McDistribution::Normal {
                    mean: 0.01,
                    std_dev: 0.01,
                },
            ),
            var(
                "home_risk_free",
                McTarget::HomeRiskFree,
                McDistribution::Normal {
                    mean: 0.0075,
                    std_dev: 0.0025,
                },
            ),
            var(
                "target_risk_free",
                McTarget::TargetRiskFree,
                McDistribution::Normal {
                    mean: 0.0425,
                    std_dev: 0.005,
                },
            ),
            var(
                "home_equity_risk_premium",
                McTarget::HomeEquityRiskPremium,
                McDistribution::Uniform {
                    min: 0.045,
                    max: 0.06,
                },
            ),
            var(
                "synergy_realization",
                McTarget::SynergyRealization,
                McDistribution::Triangular {
                    min: 0.5,
                    mode: 0.9,
                    max: 1.1,
                },
            ),
            var(
                "integration_cost_multiplier",
                McTarget::IntegrationCostMultiplier,
                McDistribution::Triangular {
                    min: 0.9,
                    mode: 1.0,
                    max: 1.5,
                },
            ),
        ]);

        let mut correlations = Vec::new();
        let price_names: Vec<String> = Benchmark::ALL
            .iter()
            .map(|b| format!("price_factor.{}", b.key()))
            .collect();
        let volume_names: Vec<String> = Segment::ALL
            .iter()
            .map(|s| format!("volume_factor.{}", s.key()))
            .collect();
        pairwise(&mut correlations, &price_names, 0.7);
        pairwise(&mut correlations, &volume_names, 0.5);
        for p in &price_names {
            for v in &volume_names {
                correlations.push(McCorrelation {
                    first: p.clone(),
                    second: v.clone(),
                    rho: 0.3,
                });
            }
        }
        correlations.push(McCorrelation {
            first: "domestic_wacc".into(),
            second: "target_risk_free".into(),
            rho: 0.5,
        });
        correlations.push(McCorrelation {
            first: "home_risk_free".into(),
            second: "target_risk_free".into(),
            rho: 0.3,
        });

        Self {
            variables,
            correlations,
        }
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    fn index_of(&self, name: &str) -> SteelDcfResult<usize> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| {
                SteelDcfError::invalid("correlations", format!("unknown variable '{name}'"))
            })
    }

    /// Full symmetric matrix with a unit diagonal.
    pub fn correlation_matrix(&self) -> SteelDcfResult<Vec<Vec<f64>>> {
        let n = self.variables.len();
        let mut matrix = vec![vec![0.0_f64; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for c in &self.correlations {
            let i = self.index_of(&c.first)?;
            let j = self.index_of(&c.second)?;
            if i == j {
                return Err(SteelDcfError::invalid(
                    "correlations",
                    format!("'{}' correlated with itself", c.first),
                ));
            }
            if !c.rho.is_finite() || c.rho.abs() > 1.0 {
                return Err(SteelDcfError::invalid(
                    "correlations",
                    format!("rho for ({}, {}) must lie in [-1, 1]", c.first, c.second),
                ));
            }
            matrix[i][j] = c.rho;
            matrix[j][i] = c.rho;
        }
        Ok(matrix)
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        if self.variables.is_empty() {
            return Err(SteelDcfError::InsufficientData(
                "At least one Monte Carlo variable is required".into(),
            ));
        }
        let mut names = BTreeSet::new();
        let mut targets = BTreeSet::new();
        for v in &self.variables {
            if !names.insert(v.name.as_str()) {
                return Err(SteelDcfError::invalid(
                    "variables",
                    format!("duplicate variable name '{}'", v.name),
                ));
            }
            if !targets.insert(&v.target) {
                return Err(SteelDcfError::invalid(
                    "variables",
                    format!("'{}' writes a target already sampled", v.name),
                ));
            }
            v.distribution.validate(&v.name)?;
        }
        self.correlation_matrix()?;
        Ok(())
    }
}

impl Default for McConfig {
    fn default() -> Self {
        Self::reference()
    }
}

fn var(name: impl Into<String>, target: McTarget, distribution: McDistribution) -> McVariable {
    McVariable {
        name: name.into(),
        target,
        distribution,
    }
}

fn pairwise(out: &mut Vec<McCorrelation>, names: &[String], rho: f64) {
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            out.push(McCorrelation {
                first: a.clone(),
                second: b.clone(),
                rho,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_has_thirty_variables() {
        let config = McConfig::reference();
        assert_eq!(config.variables.len(), 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_correlation_matrix_symmetric() {
        let m = McConfig::reference().correlation_matrix().unwrap();
        for i in 0..m.len() {
            assert_eq!(m[i][i], 1.0);
            for j in 0..m.len() {
                assert_eq!(m[i][j], m[j][i]);
            }
        }
    }

    #[test]
    fn test_unknown_correlation_variable_rejected() {
        let mut config = McConfig::reference();
        config.correlations.push(McCorrelation {
            first: "domestic_wacc".into(),
            second: "steel_tariff".into(),
            rho: 0.2,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_triangular_rejected() {
        let d = McDistribution::Triangular {
            min: 1.0,
            mode: 0.5,
            max: 2.0,
        };
        let err = d.validate("x").unwrap_err();
        assert!(matches!(err, SteelDcfError::Distribution { .. }));
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let json = r#"{
            "variables": [
                {"name": "tg", "target": {"kind": "terminal_growth"},
                 "distribution": {"type": "Uniform", "min": 0.0, "max": 0.02}},
                {"name": "hrc", "target": {"kind": "price_factor", "key": "hrc_us"},
                 "distribution": {"type": "LogNormal", "mu": 0.0, "sigma": 0.1}}
            ]
        }"#;
        let config: McConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.variables[1].target, McTarget::PriceFactor(Benchmark::HrcUs));
        assert!(config.correlations.is_empty());
        config.validate().unwrap();
    }
}
