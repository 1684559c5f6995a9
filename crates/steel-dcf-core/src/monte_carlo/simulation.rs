use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{McConfig, McTarget, McVariable};
use super::sampling::{sample_design, DesignMatrix};
use super::statistics::{compute_statistics, probability_above, McOutputStatistics};
use crate::error::SteelDcfError;
use crate::model::analysis::ValuationModel;
use crate::model::scenario::ModelScenario;
use crate::types::{decimal_from_f64, decimal_to_f64, with_metadata_f64, ComputationOutput};
use crate::SteelDcfResult;

/// Sampled values carry more digits than any input needs.
const SAMPLE_DP: u32 = 10;

/// Headline outputs of one successful draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McSampleResult {
    pub sample: usize,
    pub standalone_share_price: f64,
    pub acquirer_share_price: f64,
    pub standalone_enterprise_value: f64,
    pub acquirer_enterprise_value: f64,
    pub acquirer_wacc: f64,
    pub synergy_npv: f64,
}

/// A draw the chain rejected, with the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McFailure {
    pub sample: usize,
    pub inputs: BTreeMap<String, f64>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferComparison {
    pub offer_price: f64,
    pub probability_standalone_above: f64,
    pub probability_acquirer_above: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McSummary {
    pub standalone_share_price: McOutputStatistics,
    pub acquirer_share_price: McOutputStatistics,
    pub acquirer_premium: McOutputStatistics,
    pub standalone_enterprise_value: McOutputStatistics,
    pub acquirer_enterprise_value: McOutputStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<OfferComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McOutput {
    pub base_scenario: String,
    pub n_samples: usize,
    pub seed: u64,
    pub samples: Vec<McSampleResult>,
    pub failures: Vec<McFailure>,
    pub summary: McSummary,
}

/// Write one row of sampled values into a copy of `base`.
pub fn apply_sample(
    base: &ModelScenario,
    variables: &[McVariable],
    values: &[f64],
) -> SteelDcfResult<ModelScenario> {
    if variables.len() != values.len() {
        return Err(SteelDcfError::invalid(
            "sample",
            format!("{} values for {} variables", values.len(), variables.len()),
        ));
    }
    let mut s = base.clone();
    for (variable, raw) in variables.iter().zip(values) {
        let x = decimal_from_f64(*raw, &variable.name)?.round_dp(SAMPLE_DP);
        match &variable.target {
            McTarget::PriceFactor(b) => {
                let shocked = s.prices.factor(*b) * x;
                s.prices.factors.insert(*b, shocked);
            }
            McTarget::VolumeFactor(seg) => {
                let shocked = s.volumes.factor(*seg) * x;
                s.volumes.factors.insert(*seg, shocked);
            }
            McTarget::VolumeGrowth(seg) => {
                let shifted = s.volumes.growth(*seg) + x;
                s.volumes.growth_adjustments.insert(*seg, shifted);
            }
            McTarget::Realization(seg) => {
                s.realization_overrides.insert(*seg, x);
            }
            McTarget::ExecutionFactor(project) => {
                s.execution_overrides.insert(project.clone(), x);
            }
            McTarget::DomesticWacc => s.wacc.domestic_wacc = x,
            McTarget::TerminalGrowth => s.wacc.terminal_growth = x,
            McTarget::ExitMultiple => s.wacc.exit_multiple = x,
            McTarget::PriceGrowth => s.prices.annual_price_growth = x,
            McTarget::HomeRiskFree => s.wacc.home_risk_free = x,
            McTarget::TargetRiskFree => s.wacc.target_risk_free = x,
            McTarget::HomeEquityRiskPremium => s.wacc.home_equity_risk_premium = x,
            McTarget::SynergyRealization => s.synergy_realization = x,
            McTarget::IntegrationCostMultiplier => s.integration_cost_multiplier = x,
        }
    }
    s.validate()?;
    Ok(s)
}

fn evaluate_sample(
    model: &ValuationModel,
    base: &ModelScenario,
    config: &McConfig,
    sample: usize,
    values: &[f64],
) -> Result<McSampleResult, McFailure> {
    let run = apply_sample(base, &config.variables, values)
        .and_then(|scenario| model.analyze(&scenario, &mut Vec::new()));
    match run {
        Ok(out) => Ok(McSampleResult {
            sample,
            standalone_share_price: decimal_to_f64(out.standalone.share_price),
            acquirer_share_price: decimal_to_f64(out.acquirer.share_price),
            standalone_enterprise_value: decimal_to_f64(out.standalone.enterprise_value),
            acquirer_enterprise_value: decimal_to_f64(out.acquirer.enterprise_value),
            acquirer_wacc: decimal_to_f64(out.wacc.wacc_used),
            synergy_npv: decimal_to_f64(out.acquirer.synergy_npv),
        }),
        Err(e) => {
            tracing::warn!(sample, error = %e, "Monte Carlo sample failed");
            Err(McFailure {
                sample,
                inputs: config
                    .variables
                    .iter()
                    .map(|v| v.name.clone())
                    .zip(values.iter().copied())
                    .collect(),
                error: e.to_string(),
            })
        }
    }
}

fn summarize(
    samples: &[McSampleResult],
    offer_price: Option<f64>,
) -> SteelDcfResult<McSummary> {
    let column = |f: fn(&McSampleResult) -> f64| samples.iter().map(f).collect::<Vec<f64>>();
    let standalone = column(|r| r.standalone_share_price);
    let acquirer = column(|r| r.acquirer_share_price);
    let premium = column(|r| r.acquirer_share_price - r.standalone_share_price);

    let stats = |values: &[f64], name: &str| {
        compute_statistics(values, name).ok_or_else(|| {
            SteelDcfError::InsufficientData(format!("No successful samples for {name}"))
        })
    };

    Ok(McSummary {
        standalone_share_price: stats(&standalone, "standalone_share_price")?,
        acquirer_share_price: stats(&acquirer, "acquirer_share_price")?,
        acquirer_premium: stats(&premium, "acquirer_premium")?,
        standalone_enterprise_value: stats(
            &column(|r| r.standalone_enterprise_value),
            "standalone_enterprise_value",
        )?,
        acquirer_enterprise_value: stats(
            &column(|r| r.acquirer_enterprise_value),
            "acquirer_enterprise_value",
        )?,
        offer: offer_price.map(|offer| OfferComparison {
            offer_price: offer,
            probability_standalone_above: probability_above(&standalone, offer),
            probability_acquirer_above: probability_above(&acquirer, offer),
        }),
    })
}

/// Evaluate a pre-drawn design. Rows are split into batches across the
/// rayon pool and reassembled in sample order.
pub fn evaluate_design(
    model: &ValuationModel,
    base: &ModelScenario,
    config: &McConfig,
    design: &DesignMatrix,
) -> (Vec<McSampleResult>, Vec<McFailure>) {
    let batch = (design.len() / (rayon::current_num_threads() * 4)).max(1);
    let batches: Vec<Vec<Result<McSampleResult, McFailure>>> = design
        .rows
        .par_chunks(batch)
        .enumerate()
        .map(|(b, chunk)| {
            chunk
                .iter()
                .enumerate()
                .map(|(i, row)| evaluate_sample(model, base, config, b * batch + i, row))
                .collect()
        })
        .collect();

    let mut samples = Vec::with_capacity(design.len());
    let mut failures = Vec::new();
    for outcome in batches.into_iter().flatten() {
        match outcome {
            Ok(row) => samples.push(row),
            Err(failure) => failures.push(failure),
        }
    }
    (samples, failures)
}

/// Correlated Latin-hypercube simulation of the full valuation chain.
///
/// Workers never hold an RNG: the whole design is drawn up front from a
/// single `StdRng` seeded with `seed`, and the pool only receives immutable
/// row batches. That is what makes a run reproducible for a given seed and
/// independent of the number of worker threads. Failed draws are kept in
/// `failures` and left out of every statistic.
pub fn run_simulation(
    model: &ValuationModel,
    base: &ModelScenario,
    config: &McConfig,
    n_samples: usize,
    seed: u64,
) -> SteelDcfResult<ComputationOutput<McOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    base.validate()?;

    let design = sample_design(config, n_samples, seed)?;
    let (samples, failures) = evaluate_design(model, base, config, &design);

    if samples.is_empty() {
        return Err(SteelDcfError::InsufficientData(format!(
            "All {n_samples} Monte Carlo samples failed"
        )));
    }
    if !failures.is_empty() {
        warnings.push(format!(
            "{} of {n_samples} samples failed and were excluded",
            failures.len()
        ));
    }

    let offer = model.config().company.offer_price.map(decimal_to_f64);
    let summary = summarize(&samples, offer)?;

    let output = McOutput {
        base_scenario: base.name.clone(),
        n_samples,
        seed,
        samples,
        failures,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Latin hypercube sampling with Cholesky-correlated normals; full projection and dual-perspective DCF per sample",
        &serde_json::json!({
            "base_scenario": base.name,
            "n_samples": n_samples,
            "seed": seed,
            "variables": config.variable_names(),
            "correlated_pairs": config.correlations.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{Benchmark, Segment};
    use crate::model::config::ModelConfig;
    use crate::monte_carlo::config::McDistribution;
    use crate::scenarios::presets::{get_scenario_presets, ScenarioType};
    use rust_decimal_macros::dec;

    fn model() -> ValuationModel {
        ValuationModel::new(ModelConfig::reference()).unwrap()
    }

    fn management_case() -> ModelScenario {
        get_scenario_presets()
            .unwrap()
            .remove(&ScenarioType::ManagementCase)
            .unwrap()
    }

    fn one_variable(target: McTarget, distribution: McDistribution) -> McConfig {
        McConfig {
            variables: vec![McVariable {
                name: "v".into(),
                target,
                distribution,
            }],
            correlations: Vec::new(),
        }
    }

    #[test]
    fn test_factors_multiply_and_rates_replace() {
        let base = management_case();
        let vars = vec![
            McVariable {
                name: "hrc".into(),
                target: McTarget::PriceFactor(Benchmark::HrcUs),
                distribution: McDistribution::unit_lognormal(0.1),
            },
            McVariable {
                name: "tg".into(),
                target: McTarget::TerminalGrowth,
                distribution: McDistribution::Uniform { min: 0.0, max: 0.02 },
            },
            McVariable {
                name: "mini".into(),
                target: McTarget::VolumeGrowth(Segment::MiniMill),
                distribution: McDistribution::Normal {
                    mean: 0.0,
                    std_dev: 0.01,
                },
            },
        ];
        let s = apply_sample(&base, &vars, &[0.5, 0.005, 0.01]).unwrap();
        assert_eq!(
            s.prices.factor(Benchmark::HrcUs),
            base.prices.factor(Benchmark::HrcUs) * dec!(0.5)
        );
        assert_eq!(s.wacc.terminal_growth, dec!(0.005));
        assert_eq!(
            s.volumes.growth(Segment::MiniMill),
            base.volumes.growth(Segment::MiniMill) + dec!(0.01)
        );
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let base = management_case();
        let config = one_variable(
            McTarget::ExitMultiple,
            McDistribution::Uniform { min: 4.0, max: 5.0 },
        );
        assert!(apply_sample(&base, &config.variables, &[f64::NAN]).is_err());
    }

    #[test]
    fn test_same_seed_same_result() {
        let m = model();
        let base = management_case();
        let config = McConfig::reference();
        let a = run_simulation(&m, &base, &config, 24, 2024).unwrap().result;
        let b = run_simulation(&m, &base, &config, 24, 2024).unwrap().result;
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_result_independent_of_thread_count() {
        let m = model();
        let base = management_case();
        let config = McConfig::reference();
        let pooled = run_simulation(&m, &base, &config, 24, 99).unwrap().result;
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| run_simulation(&m, &base, &config, 24, 99))
            .unwrap()
            .result;
        assert_eq!(pooled.samples, single.samples);
    }

    #[test]
    fn test_failures_recorded_and_excluded() {
        let m = model();
        let base = management_case();
        let config = one_variable(
            McTarget::TerminalGrowth,
            McDistribution::Uniform { min: 0.0, max: 0.2 },
        );
        let out = run_simulation(&m, &base, &config, 20, 5).unwrap();
        let r = &out.result;
        assert!(!r.failures.is_empty());
        assert!(!r.samples.is_empty());
        assert_eq!(r.samples.len() + r.failures.len(), 20);
        assert_eq!(r.summary.standalone_share_price.count, r.samples.len());
        assert!(r.failures.iter().all(|f| f.inputs["v"] > 0.05));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_all_failed_is_an_error() {
        let config = one_variable(
            McTarget::TerminalGrowth,
            McDistribution::Uniform { min: 0.3, max: 0.4 },
        );
        let err = run_simulation(&model(), &management_case(), &config, 10, 1).unwrap_err();
        assert!(matches!(err, SteelDcfError::InsufficientData(_)));
    }

    #[test]
    fn test_offer_comparison_present() {
        let out = run_simulation(&model(), &management_case(), &McConfig::reference(), 16, 8)
            .unwrap()
            .result;
        let offer = out.summary.offer.unwrap();
        assert_eq!(offer.offer_price, 55.0);
        assert!((0.0..=1.0).contains(&offer.probability_acquirer_above));
    }
}
