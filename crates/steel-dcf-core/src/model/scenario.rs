use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::market::{Benchmark, Segment};
use crate::types::{Multiple, Rate};
use crate::valuation::synergies::SynergyAssumptions;
use crate::valuation::wacc::WaccInputs;
use crate::SteelDcfResult;

/// Multiplicative shocks to the base-year benchmark table plus an annual
/// nominal price drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteelPriceScenario {
    /// Benchmarks not listed use a factor of 1.0
    #[serde(default)]
    pub factors: BTreeMap<Benchmark, Rate>,
    #[serde(default)]
    pub annual_price_growth: Rate,
}

impl SteelPriceScenario {
    pub fn uniform(factor: Rate, annual_price_growth: Rate) -> Self {
        Self {
            factors: Benchmark::ALL.iter().map(|b| (*b, factor)).collect(),
            annual_price_growth,
        }
    }

    pub fn factor(&self, benchmark: Benchmark) -> Rate {
        self.factors.get(&benchmark).copied().unwrap_or(Decimal::ONE)
    }
}

impl Default for SteelPriceScenario {
    fn default() -> Self {
        Self::uniform(Decimal::ONE, Decimal::ZERO)
    }
}

/// Shipment adjustments relative to each segment's base trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeScenario {
    /// Segments not listed use 1.0
    #[serde(default)]
    pub factors: BTreeMap<Segment, Rate>,
    /// Annual growth adjustment per segment; missing segments use 0.0
    #[serde(default)]
    pub growth_adjustments: BTreeMap<Segment, Rate>,
}

impl VolumeScenario {
    pub fn uniform(factor: Rate, growth: Rate) -> Self {
        Self {
            factors: Segment::ALL.iter().map(|s| (*s, factor)).collect(),
            growth_adjustments: Segment::ALL.iter().map(|s| (*s, growth)).collect(),
        }
    }

    pub fn factor(&self, segment: Segment) -> Rate {
        self.factors.get(&segment).copied().unwrap_or(Decimal::ONE)
    }

    pub fn growth(&self, segment: Segment) -> Rate {
        self.growth_adjustments
            .get(&segment)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// One complete, validated set of assumptions for a model run.
///
/// Construct through [`ModelScenario::builder`]; deserialized scenarios are
/// validated again when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prices: SteelPriceScenario,
    pub volumes: VolumeScenario,
    pub wacc: WaccInputs,
    /// Names of enabled capital projects (baseline projects are added at run time)
    pub projects: Vec<String>,
    /// Probability-style haircut on non-committed project EBITDA
    pub execution_factor: Rate,
    #[serde(default)]
    pub execution_overrides: BTreeMap<String, Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synergies: Option<SynergyAssumptions>,
    /// Replaces the configured premium-to-benchmark for the listed segments
    #[serde(default)]
    pub realization_overrides: BTreeMap<Segment, Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc_override: Option<Rate>,
    /// Scales every synergy stream (1.0 = as modeled)
    pub synergy_realization: Rate,
    /// Scales one-time integration costs (1.0 = as modeled)
    pub integration_cost_multiplier: Rate,
}

impl ModelScenario {
    pub fn builder(name: impl Into<String>, wacc: WaccInputs) -> ModelScenarioBuilder {
        ModelScenarioBuilder::new(name, wacc)
    }

    /// Start a modified copy; the result is validated again on `build()`.
    pub fn to_builder(&self) -> ModelScenarioBuilder {
        ModelScenarioBuilder {
            scenario: self.clone(),
        }
    }

    /// Execution factor for a project, honoring per-project overrides.
    pub fn execution_factor_for(&self, project: &str) -> Rate {
        self.execution_overrides
            .get(project)
            .copied()
            .unwrap_or(self.execution_factor)
    }

    pub fn has_synergies(&self) -> bool {
        self.synergies.is_some()
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        if self.name.trim().is_empty() {
            return Err(SteelDcfError::invalid("name", "Scenario name cannot be empty"));
        }
        self.wacc.validate()?;
        if let Some(manual) = self.wacc_override {
            if manual <= self.wacc.terminal_growth {
                return Err(SteelDcfError::FinancialImpossibility(format!(
                    "Terminal growth rate ({}) must be less than the WACC override ({manual})",
                    self.wacc.terminal_growth
                )));
            }
        }
        if self.prices.annual_price_growth <= dec!(-1) {
            return Err(SteelDcfError::invalid(
                "prices.annual_price_growth",
                "Price growth must be greater than -100%",
            ));
        }
        for (segment, growth) in &self.volumes.growth_adjustments {
            if *growth <= dec!(-1) {
                return Err(SteelDcfError::invalid(
                    format!("volumes.growth_adjustments.{}", segment.key()),
                    "Volume growth must be greater than -100%",
                ));
            }
        }
        for (segment, factor) in &self.volumes.factors {
            if *factor < Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    format!("volumes.factors.{}", segment.key()),
                    "Volume factor cannot be negative",
                ));
            }
        }
        check_unit_interval("execution_factor", self.execution_factor)?;
        for (project, factor) in &self.execution_overrides {
            check_unit_interval(&format!("execution_overrides.{project}"), *factor)?;
        }
        for (segment, realization) in &self.realization_overrides {
            if *realization <= dec!(-1) {
                return Err(SteelDcfError::invalid(
                    format!("realization_overrides.{}", segment.key()),
                    "Realization factor must be greater than -100%",
                ));
            }
        }
        let mut seen = BTreeSet::new();
        for project in &self.projects {
            if !seen.insert(project.as_str()) {
                return Err(SteelDcfError::invalid(
                    "projects",
                    format!("project '{project}' is enabled twice"),
                ));
            }
        }
        if self.synergy_realization < Decimal::ZERO {
            return Err(SteelDcfError::invalid("synergy_realization", "Cannot be negative"));
        }
        if self.integration_cost_multiplier < Decimal::ZERO {
            return Err(SteelDcfError::invalid("integration_cost_multiplier", "Cannot be negative"));
        }
        if let Some(synergies) = &self.synergies {
            synergies.validate()?;
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: Rate) -> SteelDcfResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(SteelDcfError::invalid(field, "Must be between 0 and 1"));
    }
    Ok(())
}

/// Step-by-step construction of a [`ModelScenario`].
#[derive(Debug, Clone)]
pub struct ModelScenarioBuilder {
    scenario: ModelScenario,
}

impl ModelScenarioBuilder {
    pub fn new(name: impl Into<String>, wacc: WaccInputs) -> Self {
        Self {
            scenario: ModelScenario {
                name: name.into(),
                description: String::new(),
                prices: SteelPriceScenario::default(),
                volumes: VolumeScenario::default(),
                wacc,
                projects: Vec::new(),
                execution_factor: Decimal::ONE,
                execution_overrides: BTreeMap::new(),
                synergies: None,
                realization_overrides: BTreeMap::new(),
                wacc_override: None,
                synergy_realization: Decimal::ONE,
                integration_cost_multiplier: Decimal::ONE,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.scenario.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.scenario.description = description.into();
        self
    }

    pub fn prices(mut self, prices: SteelPriceScenario) -> Self {
        self.scenario.prices = prices;
        self
    }

    pub fn price_factor(mut self, benchmark: Benchmark, factor: Rate) -> Self {
        self.scenario.prices.factors.insert(benchmark, factor);
        self
    }

    pub fn price_growth(mut self, growth: Rate) -> Self {
        self.scenario.prices.annual_price_growth = growth;
        self
    }

    pub fn volumes(mut self, volumes: VolumeScenario) -> Self {
        self.scenario.volumes = volumes;
        self
    }

    pub fn volume_factor(mut self, segment: Segment, factor: Rate) -> Self {
        self.scenario.volumes.factors.insert(segment, factor);
        self
    }

    pub fn volume_growth(mut self, segment: Segment, growth: Rate) -> Self {
        self.scenario.volumes.growth_adjustments.insert(segment, growth);
        self
    }

    pub fn wacc(mut self, wacc: WaccInputs) -> Self {
        self.scenario.wacc = wacc;
        self
    }

    pub fn domestic_wacc(mut self, wacc: Rate) -> Self {
        self.scenario.wacc.domestic_wacc = wacc;
        self
    }

    pub fn terminal_growth(mut self, growth: Rate) -> Self {
        self.scenario.wacc.terminal_growth = growth;
        self
    }

    pub fn exit_multiple(mut self, multiple: Multiple) -> Self {
        self.scenario.wacc.exit_multiple = multiple;
        self
    }

    pub fn wacc_override(mut self, wacc: Option<Rate>) -> Self {
        self.scenario.wacc_override = wacc;
        self
    }

    pub fn project(mut self, name: impl Into<String>) -> Self {
        self.scenario.projects.push(name.into());
        self
    }

    pub fn projects<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenario.projects = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn execution_factor(mut self, factor: Rate) -> Self {
        self.scenario.execution_factor = factor;
        self
    }

    pub fn execution_override(mut self, project: impl Into<String>, factor: Rate) -> Self {
        self.scenario.execution_overrides.insert(project.into(), factor);
        self
    }

    pub fn synergies(mut self, synergies: Option<SynergyAssumptions>) -> Self {
        self.scenario.synergies = synergies;
        self
    }

    pub fn realization_override(mut self, segment: Segment, realization: Rate) -> Self {
        self.scenario.realization_overrides.insert(segment, realization);
        self
    }

    pub fn synergy_realization(mut self, factor: Rate) -> Self {
        self.scenario.synergy_realization = factor;
        self
    }

    pub fn integration_cost_multiplier(mut self, factor: Rate) -> Self {
        self.scenario.integration_cost_multiplier = factor;
        self
    }

    pub fn build(self) -> SteelDcfResult<ModelScenario> {
        self.scenario.validate()?;
        Ok(self.scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Currency;
    use rust_decimal_macros::dec;

    fn wacc() -> WaccInputs {
        WaccInputs {
            domestic_wacc: dec!(0.107),
            terminal_growth: dec!(0.01),
            exit_multiple: dec!(4.5),
            home_risk_free: dec!(0.0075),
            target_risk_free: dec!(0.0425),
            home_equity_risk_premium: dec!(0.05),
            home_credit_spread: dec!(0.01),
            home_tax_rate: dec!(0.30),
            home_debt_ratio: dec!(0.35),
            home_currency: Currency::JPY,
            target_currency: Currency::USD,
        }
    }

    #[test]
    fn test_builder_defaults() {
        let s = ModelScenario::builder("base", wacc()).build().unwrap();
        assert_eq!(s.prices.factor(Benchmark::HrcUs), Decimal::ONE);
        assert_eq!(s.volumes.factor(Segment::Tubular), Decimal::ONE);
        assert_eq!(s.volumes.growth(Segment::Tubular), Decimal::ZERO);
        assert_eq!(s.execution_factor, Decimal::ONE);
        assert!(!s.has_synergies());
    }

    #[test]
    fn test_terminal_growth_at_or_above_wacc_rejected() {
        let err = ModelScenario::builder("bad", wacc())
            .terminal_growth(dec!(0.107))
            .build()
            .unwrap_err();
        assert!(matches!(err, SteelDcfError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_override_below_terminal_growth_rejected() {
        let result = ModelScenario::builder("bad", wacc())
            .wacc_override(Some(dec!(0.005)))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_execution_factor_bounds() {
        assert!(ModelScenario::builder("bad", wacc())
            .execution_factor(dec!(1.2))
            .build()
            .is_err());
        assert!(ModelScenario::builder("bad", wacc())
            .execution_override("greenfield_eaf", dec!(-0.1))
            .build()
            .is_err());
    }

    #[test]
    fn test_execution_override_lookup() {
        let s = ModelScenario::builder("s", wacc())
            .execution_factor(dec!(0.8))
            .execution_override("greenfield_eaf", dec!(0.5))
            .build()
            .unwrap();
        assert_eq!(s.execution_factor_for("greenfield_eaf"), dec!(0.5));
        assert_eq!(s.execution_factor_for("gary_hot_strip_mill"), dec!(0.8));
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let result = ModelScenario::builder("dup", wacc())
            .project("greenfield_eaf")
            .project("greenfield_eaf")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_price_factor_is_allowed() {
        let s = ModelScenario::builder("crash", wacc())
            .price_factor(Benchmark::HrcUs, dec!(-0.2))
            .build()
            .unwrap();
        assert_eq!(s.prices.factor(Benchmark::HrcUs), dec!(-0.2));
    }

    #[test]
    fn test_to_builder_revalidates() {
        let s = ModelScenario::builder("s", wacc()).build().unwrap();
        assert!(s.to_builder().domestic_wacc(dec!(0.005)).build().is_err());
    }
}
