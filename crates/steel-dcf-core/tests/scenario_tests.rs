use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use steel_dcf_core::model::{ModelConfig, ValuationModel};
use steel_dcf_core::scenarios::{
    calculate_probability_weighted_valuation, default_scenario_weights, get_scenario_presets,
    get_synergy_presets, wacc_sensitivity, ScenarioType, SensitivityInput, SweepAxis,
};
use steel_dcf_core::types::{Perspective, SensitivityVariable};
use steel_dcf_core::SteelDcfError;

fn model() -> ValuationModel {
    ValuationModel::new(ModelConfig::reference()).unwrap()
}

#[test]
fn test_every_preset_validates_and_runs() {
    let presets = get_scenario_presets().unwrap();
    assert_eq!(presets.len(), 8);
    let m = model();
    for (kind, scenario) in &presets {
        scenario.validate().unwrap();
        let out = m.analyze(scenario, &mut Vec::new());
        assert!(out.is_ok(), "{kind}: {:?}", out.err());
    }
}

#[test]
fn test_synergy_presets_are_ordered_by_ambition() {
    let presets = get_synergy_presets();
    let run_rate = |key: &str| presets[key].operating.risked_run_rate();
    assert!(run_rate("conservative") < run_rate("base"));
    assert!(run_rate("base") < run_rate("full"));
}

#[test]
fn test_expected_value_is_weighted_sum() {
    let presets = get_scenario_presets().unwrap();
    let weights = default_scenario_weights();
    let out = calculate_probability_weighted_valuation(&model(), &presets, &weights)
        .unwrap()
        .result;

    let standalone: Decimal = out
        .results
        .iter()
        .map(|r| r.probability * r.standalone_share_price)
        .sum();
    let acquirer: Decimal = out
        .results
        .iter()
        .map(|r| r.probability * r.acquirer_share_price)
        .sum();
    assert_eq!(out.expected_standalone_share_price, standalone);
    assert_eq!(out.expected_acquirer_share_price, acquirer);
    assert!(out.expected_premium > Decimal::ZERO);
}

#[test]
fn test_weights_off_by_more_than_tolerance_rejected() {
    let presets = get_scenario_presets().unwrap();
    let mut weights = default_scenario_weights();
    weights.insert(ScenarioType::SevereDownturn, dec!(0.0501));
    let err = calculate_probability_weighted_valuation(&model(), &presets, &weights).unwrap_err();
    assert!(matches!(err, SteelDcfError::InvalidInput { .. }));
}

#[test]
fn test_weights_within_tolerance_accepted() {
    let presets = get_scenario_presets().unwrap();
    let mut weights = default_scenario_weights();
    weights.insert(ScenarioType::SevereDownturn, dec!(0.0500005));
    assert!(calculate_probability_weighted_valuation(&model(), &presets, &weights).is_ok());
}

#[test]
fn test_negative_weight_rejected() {
    let presets = get_scenario_presets().unwrap();
    let weights = BTreeMap::from([
        (ScenarioType::BaseCase, dec!(1.2)),
        (ScenarioType::Downside, dec!(-0.2)),
    ]);
    assert!(calculate_probability_weighted_valuation(&model(), &presets, &weights).is_err());
}

#[test]
fn test_sensitivity_grid_centred_on_scenario() {
    let presets = get_scenario_presets().unwrap();
    let input = SensitivityInput {
        perspective: Perspective::Acquirer,
        wacc: SensitivityVariable {
            name: "wacc".into(),
            min: dec!(0.06),
            max: dec!(0.10),
            step: dec!(0.01),
        },
        axis: SweepAxis::TerminalGrowth,
        second: SensitivityVariable {
            name: "terminal_growth".into(),
            min: dec!(0.0),
            max: dec!(0.02),
            step: dec!(0.01),
        },
    };
    let out = wacc_sensitivity(&model(), &presets[&ScenarioType::BaseCase], &input)
        .unwrap()
        .result;
    assert_eq!(out.matrix.len(), 5);
    assert_eq!(out.matrix[0].len(), 3);
    // Acquirer rate ~7.8%, base terminal growth 1%
    assert_eq!(out.base_case_position, (2, 1));
    for row in &out.matrix {
        assert!(row[2] > row[0]);
    }
}
