use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::model::config::reference_wacc_inputs;
use crate::model::scenario::{ModelScenario, SteelPriceScenario, VolumeScenario};
use crate::projection::capital_projects::{
    GARY_HOT_STRIP_MILL, GREENFIELD_EAF, KEETAC_DR_PELLETS, MON_VALLEY_HOT_STRIP_MILL,
};
use crate::types::Rate;
use crate::valuation::synergies::{
    IntegrationCosts, OperatingSynergies, RevenueSynergies, SynergyAssumptions,
    SynergyRampSchedule, TechnologyTransfer,
};
use crate::valuation::wacc::{calculate_wacc, WaccInput, WaccInputs};
use crate::SteelDcfResult;

/// Named scenario bundles shipped with the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    SevereDownturn,
    Downside,
    BaseCase,
    AboveAverage,
    Optimistic,
    ManagementCase,
    WallStreetConsensus,
    CommittedInvestment,
}

impl ScenarioType {
    /// Steel-cycle scenarios from worst to best.
    pub const ORDERED: [ScenarioType; 5] = [
        ScenarioType::SevereDownturn,
        ScenarioType::Downside,
        ScenarioType::BaseCase,
        ScenarioType::AboveAverage,
        ScenarioType::Optimistic,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ScenarioType::SevereDownturn => "severe_downturn",
            ScenarioType::Downside => "downside",
            ScenarioType::BaseCase => "base_case",
            ScenarioType::AboveAverage => "above_average",
            ScenarioType::Optimistic => "optimistic",
            ScenarioType::ManagementCase => "management_case",
            ScenarioType::WallStreetConsensus => "wall_street_consensus",
            ScenarioType::CommittedInvestment => "committed_investment",
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// CAPM build-up of the domestic buyer's cost of capital.
pub fn domestic_wacc_input() -> WaccInput {
    WaccInput {
        risk_free_rate: dec!(0.0425),
        equity_risk_premium: dec!(0.055),
        beta: dec!(1.45),
        cost_of_debt: dec!(0.0675),
        tax_rate: dec!(0.21),
        debt_weight: dec!(0.22),
        equity_weight: dec!(0.78),
        size_premium: None,
        specific_risk_premium: None,
    }
}

/// Reference rate inputs with the domestic WACC taken from the CAPM build-up.
pub fn base_wacc_inputs() -> SteelDcfResult<WaccInputs> {
    let domestic = calculate_wacc(&domestic_wacc_input())?;
    Ok(WaccInputs {
        domestic_wacc: domestic.result.wacc,
        ..reference_wacc_inputs()
    })
}

fn cycle_scenario(
    name: &str,
    description: &str,
    wacc: &WaccInputs,
    price_factor: Rate,
    volume_factor: Rate,
) -> SteelDcfResult<ModelScenario> {
    ModelScenario::builder(name, wacc.clone())
        .description(description)
        .prices(SteelPriceScenario::uniform(price_factor, dec!(0.01)))
        .volumes(VolumeScenario::uniform(volume_factor, Decimal::ZERO))
        .build()
}

fn optional_projects() -> [&'static str; 4] {
    [
        GARY_HOT_STRIP_MILL,
        MON_VALLEY_HOT_STRIP_MILL,
        KEETAC_DR_PELLETS,
        GREENFIELD_EAF,
    ]
}

/// Every named scenario, fully populated and validated.
///
/// The five cycle scenarios share rates and projects so that only the
/// price/volume environment differs between them.
pub fn get_scenario_presets() -> SteelDcfResult<BTreeMap<ScenarioType, ModelScenario>> {
    let wacc = base_wacc_inputs()?;
    let synergies = get_synergy_presets();
    let mut presets = BTreeMap::new();

    presets.insert(
        ScenarioType::SevereDownturn,
        cycle_scenario(
            "Severe Downturn",
            "2015/2020-style trough: benchmark prices -30%, shipments -15%",
            &wacc,
            dec!(0.70),
            dec!(0.85),
        )?,
    );
    presets.insert(
        ScenarioType::Downside,
        cycle_scenario(
            "Downside",
            "Soft cycle: prices -15%, shipments -7%",
            &wacc,
            dec!(0.85),
            dec!(0.93),
        )?,
    );
    presets.insert(
        ScenarioType::BaseCase,
        cycle_scenario(
            "Base Case",
            "Mid-cycle benchmark prices with 1% nominal drift",
            &wacc,
            Decimal::ONE,
            Decimal::ONE,
        )?,
    );
    presets.insert(
        ScenarioType::AboveAverage,
        cycle_scenario(
            "Above Average",
            "Firm cycle: prices +10%, shipments +3%",
            &wacc,
            dec!(1.10),
            dec!(1.03),
        )?,
    );
    presets.insert(
        ScenarioType::Optimistic,
        cycle_scenario(
            "Optimistic",
            "Peak-like pricing: prices +20%, shipments +6%",
            &wacc,
            dec!(1.20),
            dec!(1.06),
        )?,
    );

    presets.insert(
        ScenarioType::ManagementCase,
        ModelScenario::builder("Management Case", wacc.clone())
            .description("Full announced investment program at management's pricing deck")
            .prices(SteelPriceScenario::uniform(dec!(1.05), dec!(0.015)))
            .volumes(VolumeScenario::uniform(dec!(1.02), dec!(0.005)))
            .projects(optional_projects())
            .execution_factor(dec!(0.85))
            .terminal_growth(dec!(0.015))
            .exit_multiple(dec!(5.0))
            .synergies(synergies.get("base").cloned())
            .build()?,
    );
    presets.insert(
        ScenarioType::WallStreetConsensus,
        ModelScenario::builder("Wall Street Consensus", wacc.clone())
            .description("Sell-side view: softer prices, higher discount rate, baseline program only")
            .prices(SteelPriceScenario::uniform(dec!(0.95), dec!(0.01)))
            .volumes(VolumeScenario::uniform(dec!(0.98), Decimal::ZERO))
            .domestic_wacc(dec!(0.115))
            .terminal_growth(dec!(0.01))
            .exit_multiple(dec!(4.5))
            .build()?,
    );
    presets.insert(
        ScenarioType::CommittedInvestment,
        ModelScenario::builder("Committed Investment", wacc)
            .description("Acquirer funds the full program; mid-cycle prices")
            .prices(SteelPriceScenario::uniform(Decimal::ONE, dec!(0.01)))
            .projects(optional_projects())
            .execution_factor(dec!(0.90))
            .synergies(synergies.get("base").cloned())
            .build()?,
    );

    Ok(presets)
}

/// Probabilities over the five cycle scenarios.
pub fn default_scenario_weights() -> BTreeMap<ScenarioType, Rate> {
    BTreeMap::from([
        (ScenarioType::SevereDownturn, dec!(0.05)),
        (ScenarioType::Downside, dec!(0.20)),
        (ScenarioType::BaseCase, dec!(0.45)),
        (ScenarioType::AboveAverage, dec!(0.20)),
        (ScenarioType::Optimistic, dec!(0.10)),
    ])
}

/// Synergy cases keyed `conservative`, `base` and `full`.
pub fn get_synergy_presets() -> BTreeMap<String, SynergyAssumptions> {
    let conservative = SynergyAssumptions {
        operating: OperatingSynergies {
            procurement: dec!(60),
            procurement_confidence: dec!(0.60),
            logistics: dec!(30),
            logistics_confidence: dec!(0.50),
            overhead: dec!(40),
            overhead_confidence: dec!(0.70),
        },
        technology: TechnologyTransfer {
            yield_improvement: dec!(0.005),
            quality_premium: dec!(0.002),
            cost_reduction: dec!(0.005),
            confidence: dec!(0.40),
        },
        revenue: RevenueSynergies {
            cross_sell_revenue: dec!(150),
            mix_uplift_revenue: dec!(100),
            margin: dec!(0.15),
            confidence: dec!(0.40),
        },
        integration: IntegrationCosts {
            it_systems: dec!(60),
            restructuring: dec!(120),
            advisory: dec!(50),
            other: dec!(20),
            spend_profile: vec![dec!(0.50), dec!(0.35), dec!(0.15)],
        },
        ramp: SynergyRampSchedule {
            by_year: vec![dec!(0.15), dec!(0.40), dec!(0.70), dec!(0.90), Decimal::ONE],
        },
    };

    let base = SynergyAssumptions {
        operating: OperatingSynergies {
            procurement: dec!(100),
            procurement_confidence: dec!(0.75),
            logistics: dec!(50),
            logistics_confidence: dec!(0.70),
            overhead: dec!(60),
            overhead_confidence: dec!(0.80),
        },
        technology: TechnologyTransfer {
            yield_improvement: dec!(0.010),
            quality_premium: dec!(0.005),
            cost_reduction: dec!(0.010),
            confidence: dec!(0.60),
        },
        revenue: RevenueSynergies {
            cross_sell_revenue: dec!(300),
            mix_uplift_revenue: dec!(200),
            margin: dec!(0.18),
            confidence: dec!(0.60),
        },
        integration: IntegrationCosts {
            it_systems: dec!(50),
            restructuring: dec!(100),
            advisory: dec!(40),
            other: dec!(20),
            spend_profile: vec![dec!(0.50), dec!(0.35), dec!(0.15)],
        },
        ramp: SynergyRampSchedule::default(),
    };

    let full = SynergyAssumptions {
        operating: OperatingSynergies {
            procurement: dec!(150),
            procurement_confidence: Decimal::ONE,
            logistics: dec!(75),
            logistics_confidence: Decimal::ONE,
            overhead: dec!(90),
            overhead_confidence: Decimal::ONE,
        },
        technology: TechnologyTransfer {
            yield_improvement: dec!(0.015),
            quality_premium: dec!(0.008),
            cost_reduction: dec!(0.015),
            confidence: Decimal::ONE,
        },
        revenue: RevenueSynergies {
            cross_sell_revenue: dec!(400),
            mix_uplift_revenue: dec!(300),
            margin: dec!(0.20),
            confidence: Decimal::ONE,
        },
        integration: IntegrationCosts {
            it_systems: dec!(40),
            restructuring: dec!(80),
            advisory: dec!(30),
            other: dec!(10),
            spend_profile: vec![dec!(0.60), dec!(0.40)],
        },
        ramp: SynergyRampSchedule {
            by_year: vec![dec!(0.40), dec!(0.80), Decimal::ONE],
        },
    };

    BTreeMap::from([
        ("conservative".to_string(), conservative),
        ("base".to_string(), base),
        ("full".to_string(), full),
    ])
}
