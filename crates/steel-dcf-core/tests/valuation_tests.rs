use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use steel_dcf_core::market::Segment;
use steel_dcf_core::model::{reference_wacc_inputs, ModelConfig, ModelScenario, ValuationModel};
use steel_dcf_core::scenarios::{get_scenario_presets, ScenarioType};
use steel_dcf_core::types::Perspective;
use steel_dcf_core::valuation::dcf::{value, ValuationTerms};
use steel_dcf_core::valuation::irp_convert;
use steel_dcf_core::SteelDcfError;

fn model() -> ValuationModel {
    ValuationModel::new(ModelConfig::reference()).unwrap()
}

fn preset(kind: ScenarioType) -> ModelScenario {
    get_scenario_presets().unwrap().remove(&kind).unwrap()
}

// ===========================================================================
// Consolidation
// ===========================================================================

#[test]
fn test_consolidated_lines_equal_segment_sums_for_every_preset() {
    let m = model();
    for (kind, scenario) in get_scenario_presets().unwrap() {
        let out = m.analyze(&scenario, &mut Vec::new()).unwrap();
        assert!(out.aggregation.passed(), "{kind}: {:?}", out.aggregation.breaches);

        for (i, row) in out.consolidated.iter().enumerate() {
            let mut revenue = Decimal::ZERO;
            let mut ebitda = Decimal::ZERO;
            let mut fcf = Decimal::ZERO;
            for projection in out.segments.values() {
                assert_eq!(projection.rows[i].year, row.year);
                revenue += projection.rows[i].lines.revenue;
                ebitda += projection.rows[i].lines.ebitda;
                fcf += projection.rows[i].lines.fcf;
            }
            assert!((row.lines.revenue - revenue).abs() < dec!(0.01), "{kind} {}", row.year);
            assert!((row.lines.ebitda - ebitda).abs() < dec!(0.01), "{kind} {}", row.year);
            assert!((row.lines.fcf - fcf).abs() < dec!(0.01), "{kind} {}", row.year);
        }
    }
}

#[test]
fn test_all_four_segments_projected_over_ten_years() {
    let out = model()
        .analyze(&preset(ScenarioType::BaseCase), &mut Vec::new())
        .unwrap();
    assert_eq!(out.segments.len(), 4);
    for segment in Segment::ALL {
        let rows = &out.segments[&segment].rows;
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].year, 2025);
        assert_eq!(rows[9].year, 2034);
    }
}

// ===========================================================================
// Discount rates
// ===========================================================================

#[test]
fn test_lower_wacc_gives_higher_standalone_value() {
    let m = model();
    let base = preset(ScenarioType::BaseCase);
    let low = base.to_builder().domestic_wacc(dec!(0.08)).build().unwrap();
    let high = base.to_builder().domestic_wacc(dec!(0.14)).build().unwrap();
    let low_out = m.analyze(&low, &mut Vec::new()).unwrap();
    let high_out = m.analyze(&high, &mut Vec::new()).unwrap();
    assert!(
        low_out.standalone.share_price > high_out.standalone.share_price,
        "8%: {} vs 14%: {}",
        low_out.standalone.share_price,
        high_out.standalone.share_price
    );
}

#[test]
fn test_irp_conversion_matches_closed_form() {
    // (1.05)(1.04)/(1.01) - 1 = 0.0811881...
    let converted = irp_convert(dec!(0.05), dec!(0.01), dec!(0.04)).unwrap();
    assert!((converted - dec!(0.081188)).abs() < dec!(0.0001), "got {converted}");
}

#[test]
fn test_acquirer_rate_below_domestic_when_home_rates_lower() {
    let out = model()
        .analyze(&preset(ScenarioType::BaseCase), &mut Vec::new())
        .unwrap();
    assert!(out.wacc.wacc_used < out.wacc.domestic_wacc);
    assert!(out.wacc.wacc_advantage > Decimal::ZERO);
    assert!(out.acquirer.share_price >= out.standalone.share_price);
}

#[test]
fn test_terminal_growth_at_or_above_wacc_rejected() {
    let err = ModelScenario::builder("tg", reference_wacc_inputs())
        .terminal_growth(dec!(0.12))
        .build()
        .unwrap_err();
    assert!(matches!(err, SteelDcfError::FinancialImpossibility(_)));

    let err = ModelScenario::builder("override", reference_wacc_inputs())
        .wacc_override(Some(dec!(0.009)))
        .build()
        .unwrap_err();
    assert!(matches!(err, SteelDcfError::FinancialImpossibility(_)));
}

// ===========================================================================
// Equity bridge
// ===========================================================================

#[test]
fn test_share_price_floored_at_zero_when_prices_collapse() {
    let scenario = preset(ScenarioType::BaseCase)
        .to_builder()
        .prices(steel_dcf_core::model::SteelPriceScenario::uniform(dec!(0.02), Decimal::ZERO))
        .build()
        .unwrap();
    let mut warnings = Vec::new();
    let out = model().analyze(&scenario, &mut warnings).unwrap();
    assert!(out.standalone.equity_value < Decimal::ZERO);
    assert_eq!(out.standalone.share_price, Decimal::ZERO);
    assert!(out.acquirer.share_price >= Decimal::ZERO);
    assert!(warnings.iter().any(|w| w.contains("negative")));
    assert!(warnings.iter().any(|w| w.contains("EBITDA margin held")));
}

// ===========================================================================
// Financing
// ===========================================================================

#[test]
fn test_no_financing_impact_for_baseline_program() {
    let out = model()
        .analyze(&preset(ScenarioType::BaseCase), &mut Vec::new())
        .unwrap();
    assert!(out.financing.is_zero());
    assert_eq!(out.standalone.financing_adjustment, Decimal::ZERO);
    assert_eq!(out.standalone.shares_outstanding, dec!(225));
}

#[test]
fn test_full_program_creates_financing_gap() {
    let out = model()
        .analyze(&preset(ScenarioType::CommittedInvestment), &mut Vec::new())
        .unwrap();
    let f = &out.financing;
    assert!(f.financing_gap > Decimal::ZERO);
    assert_eq!(f.new_debt + f.new_equity, f.financing_gap);
    assert!(f.new_shares > Decimal::ZERO);
    assert!(f.adjustment > Decimal::ZERO);
    assert_eq!(out.standalone.shares_outstanding, dec!(225) + f.new_shares);
    assert_eq!(out.standalone.financing_adjustment, f.adjustment);
    // The acquirer funds the program from its own balance sheet
    assert_eq!(out.acquirer.shares_outstanding, dec!(225));
    assert_eq!(out.acquirer.financing_adjustment, Decimal::ZERO);
}

// ===========================================================================
// Synergies
// ===========================================================================

#[test]
fn test_synergies_reach_acquirer_only() {
    let m = model();
    let with = preset(ScenarioType::ManagementCase);
    let without = with.to_builder().synergies(None).build().unwrap();
    let a = m.analyze(&with, &mut Vec::new()).unwrap();
    let b = m.analyze(&without, &mut Vec::new()).unwrap();

    assert_eq!(a.standalone.share_price, b.standalone.share_price);
    assert_eq!(a.standalone.synergy_npv, Decimal::ZERO);
    assert!(a.acquirer.synergy_npv > Decimal::ZERO);
    assert!(a.acquirer.share_price > b.acquirer.share_price);
    assert!(b.synergies.is_none());
}

#[test]
fn test_standalone_valuation_refuses_synergies() {
    let m = model();
    let out = m
        .analyze(&preset(ScenarioType::ManagementCase), &mut Vec::new())
        .unwrap();
    let synergies = out.synergies.as_ref().unwrap();
    let terms = ValuationTerms {
        perspective: Perspective::Standalone,
        wacc: dec!(0.107),
        terminal_growth: dec!(0.01),
        exit_multiple: dec!(4.5),
        shares_outstanding: dec!(225),
        financing_adjustment: Decimal::ZERO,
    };
    let err = value(
        &out.consolidated,
        &terms,
        &m.config().company.bridge,
        Some(synergies),
        &mut Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, SteelDcfError::InvalidInput { .. }));
}

// ===========================================================================
// End to end
// ===========================================================================

#[test]
fn test_base_case_share_prices_in_plausible_range() {
    let out = model()
        .run_full_analysis(&preset(ScenarioType::BaseCase))
        .unwrap()
        .result;
    let standalone = out.standalone.share_price;
    assert!(
        standalone >= dec!(30) && standalone <= dec!(60),
        "standalone {standalone}"
    );
    assert!(out.acquirer.share_price >= standalone);
    assert_eq!(out.acquirer_premium, out.acquirer.share_price - standalone);
    assert_eq!(out.offer_price, Some(dec!(55)));
}

#[test]
fn test_both_perspectives_rise_through_the_cycle() {
    let m = model();
    let presets = get_scenario_presets().unwrap();
    let mut previous: Option<(Decimal, Decimal)> = None;
    for kind in ScenarioType::ORDERED {
        let out = m.analyze(&presets[&kind], &mut Vec::new()).unwrap();
        let current = (out.standalone.share_price, out.acquirer.share_price);
        if let Some((standalone, acquirer)) = previous {
            assert!(current.0 > standalone, "{kind} standalone");
            assert!(current.1 > acquirer, "{kind} acquirer");
        }
        previous = Some(current);
    }
}

#[test]
fn test_scenario_roundtrips_through_json() {
    let scenario = preset(ScenarioType::ManagementCase);
    let json = serde_json::to_string(&scenario).unwrap();
    let back: ModelScenario = serde_json::from_str(&json).unwrap();
    assert_eq!(back, scenario);

    let m = model();
    let a = m.analyze(&scenario, &mut Vec::new()).unwrap();
    let b = m.analyze(&back, &mut Vec::new()).unwrap();
    assert_eq!(a.acquirer.share_price, b.acquirer.share_price);
}

#[test]
fn test_project_economics_for_every_catalog_project() {
    let out = model()
        .project_economics(&preset(ScenarioType::BaseCase))
        .unwrap()
        .result;
    let names: BTreeMap<&str, bool> = out.iter().map(|p| (p.name.as_str(), p.committed)).collect();
    assert_eq!(names.len(), 5);
    assert_eq!(names.get("big_river_2"), Some(&true));
}
