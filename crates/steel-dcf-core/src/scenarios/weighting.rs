use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::presets::ScenarioType;
use crate::error::SteelDcfError;
use crate::model::analysis::ValuationModel;
use crate::model::scenario::ModelScenario;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::SteelDcfResult;

const WEIGHT_TOLERANCE: Decimal = dec!(0.000001);

/// Outcome of one weighted scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedScenarioResult {
    pub scenario: ScenarioType,
    pub name: String,
    pub probability: Rate,
    pub standalone_share_price: Money,
    pub acquirer_share_price: Money,
    /// Standalone deviation from the probability-weighted standalone value
    pub standalone_deviation: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedValuation {
    pub results: Vec<WeightedScenarioResult>,
    pub expected_standalone_share_price: Money,
    pub expected_acquirer_share_price: Money,
    pub expected_premium: Money,
}

/// Discrete expectation of both share prices over weighted scenarios.
///
/// Weights must each lie in [0, 1] and sum to 1 within 1e-6; every weighted
/// scenario must exist in `scenarios`.
pub fn calculate_probability_weighted_valuation(
    model: &ValuationModel,
    scenarios: &BTreeMap<ScenarioType, ModelScenario>,
    weights: &BTreeMap<ScenarioType, Rate>,
) -> SteelDcfResult<ComputationOutput<WeightedValuation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if weights.is_empty() {
        return Err(SteelDcfError::InsufficientData(
            "At least one weighted scenario required".into(),
        ));
    }
    for (kind, probability) in weights {
        if *probability < Decimal::ZERO || *probability > Decimal::ONE {
            return Err(SteelDcfError::invalid(
                format!("weights.{kind}"),
                "Probability must be between 0 and 1",
            ));
        }
    }
    let total: Rate = weights.values().copied().sum();
    if (total - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
        return Err(SteelDcfError::invalid(
            "weights",
            format!("Probabilities must sum to 1.0 (got {total})"),
        ));
    }

    let mut results = Vec::with_capacity(weights.len());
    let mut expected_standalone = Decimal::ZERO;
    let mut expected_acquirer = Decimal::ZERO;

    for (kind, probability) in weights {
        let scenario = scenarios.get(kind).ok_or_else(|| {
            SteelDcfError::invalid(format!("weights.{kind}"), "No scenario defined for this weight")
        })?;
        let mut run_warnings = Vec::new();
        let out = model.analyze(scenario, &mut run_warnings)?;
        warnings.extend(run_warnings.into_iter().map(|w| format!("[{kind}] {w}")));

        expected_standalone += *probability * out.standalone.share_price;
        expected_acquirer += *probability * out.acquirer.share_price;
        results.push(WeightedScenarioResult {
            scenario: *kind,
            name: scenario.name.clone(),
            probability: *probability,
            standalone_share_price: out.standalone.share_price,
            acquirer_share_price: out.acquirer.share_price,
            standalone_deviation: Decimal::ZERO,
        });
    }

    for r in &mut results {
        r.standalone_deviation = r.standalone_share_price - expected_standalone;
    }

    let output = WeightedValuation {
        results,
        expected_standalone_share_price: expected_standalone,
        expected_acquirer_share_price: expected_acquirer,
        expected_premium: expected_acquirer - expected_standalone,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted scenario valuation",
        weights,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::ModelConfig;
    use crate::scenarios::presets::{default_scenario_weights, get_scenario_presets};

    fn model() -> ValuationModel {
        ValuationModel::new(ModelConfig::reference()).unwrap()
    }

    #[test]
    fn test_weighted_value_between_extremes() {
        let presets = get_scenario_presets().unwrap();
        let weights = default_scenario_weights();
        let out = calculate_probability_weighted_valuation(&model(), &presets, &weights)
            .unwrap()
            .result;
        let prices: Vec<Money> = out.results.iter().map(|r| r.standalone_share_price).collect();
        let min = prices.iter().copied().min().unwrap();
        let max = prices.iter().copied().max().unwrap();
        assert!(out.expected_standalone_share_price >= min);
        assert!(out.expected_standalone_share_price <= max);
        assert_eq!(out.results.len(), 5);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let presets = get_scenario_presets().unwrap();
        let mut weights = default_scenario_weights();
        weights.insert(ScenarioType::BaseCase, dec!(0.46));
        let err =
            calculate_probability_weighted_valuation(&model(), &presets, &weights).unwrap_err();
        assert!(matches!(err, SteelDcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_scenario_rejected() {
        let presets = get_scenario_presets().unwrap();
        let mut partial = presets.clone();
        partial.remove(&ScenarioType::Optimistic);
        let weights = default_scenario_weights();
        assert!(calculate_probability_weighted_valuation(&model(), &partial, &weights).is_err());
    }

    #[test]
    fn test_single_certain_scenario() {
        let presets = get_scenario_presets().unwrap();
        let weights = BTreeMap::from([(ScenarioType::BaseCase, Decimal::ONE)]);
        let out = calculate_probability_weighted_valuation(&model(), &presets, &weights)
            .unwrap()
            .result;
        assert_eq!(out.results[0].standalone_deviation, Decimal::ZERO);
    }
}
