use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::ModelConfig;
use super::scenario::ModelScenario;
use crate::market::Segment;
use crate::projection::capital_projects::{evaluate_project, ProjectEconomics};
use crate::projection::consolidation::{
    consolidate, verify_aggregation, AggregationReport, ConsolidatedYear,
};
use crate::projection::financials::{project_segment, EnabledProject, SegmentProjection};
use crate::projection::price_volume::PriceVolumeEngine;
use crate::types::{with_metadata, ComputationOutput, Money, Perspective};
use crate::valuation::dcf::{value, ValuationResult, ValuationTerms};
use crate::valuation::financing::{financing_impact, FinancingImpact, FinancingTerms};
use crate::valuation::synergies::{synergy_npv, SynergyTerms, SynergyValuation};
use crate::valuation::wacc::{cross_border_wacc, CrossBorderWacc};
use crate::SteelDcfResult;

/// Full output of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub scenario: String,
    pub base_year: i32,
    /// Baseline plus scenario-enabled projects, in catalog order
    pub projects: Vec<String>,
    pub segments: BTreeMap<Segment, SegmentProjection>,
    pub consolidated: Vec<ConsolidatedYear>,
    pub aggregation: AggregationReport,
    pub wacc: CrossBorderWacc,
    pub financing: FinancingImpact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synergies: Option<SynergyValuation>,
    pub standalone: ValuationResult,
    pub acquirer: ValuationResult,
    /// Acquirer minus standalone share price ($/share)
    pub acquirer_premium: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<Money>,
}

/// The projection and valuation chain bound to one immutable configuration.
#[derive(Debug, Clone)]
pub struct ValuationModel {
    config: ModelConfig,
}

impl ValuationModel {
    pub fn new(config: ModelConfig) -> SteelDcfResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run the full chain and wrap the result in the standard envelope.
    pub fn run_full_analysis(
        &self,
        scenario: &ModelScenario,
    ) -> SteelDcfResult<ComputationOutput<AnalysisOutput>> {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let output = self.analyze(scenario, &mut warnings)?;
        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Segment price x volume projection; blended Gordon / exit-multiple DCF under domestic and IRP-converted acquirer WACC",
            scenario,
            warnings,
            elapsed,
            output,
        ))
    }

    /// Same chain without the envelope. Used by the sampling and sweep code.
    pub fn analyze(
        &self,
        scenario: &ModelScenario,
        warnings: &mut Vec<String>,
    ) -> SteelDcfResult<AnalysisOutput> {
        scenario.validate()?;
        let config = &self.config;
        let years = config.projection_years();
        let company = &config.company;

        // --- Capital program ---
        let requested: BTreeSet<String> = config
            .projects
            .baseline_names()
            .into_iter()
            .chain(scenario.projects.iter().cloned())
            .collect();
        let project_names: Vec<String> = requested.into_iter().collect();
        let enabled: Vec<EnabledProject<'_>> = config
            .projects
            .resolve(&project_names)?
            .into_iter()
            .map(|project| EnabledProject {
                project,
                execution: project
                    .execution_multiplier(scenario.execution_factor_for(&project.name)),
            })
            .collect();

        // --- Segment projections ---
        let engine = PriceVolumeEngine::new(
            &config.benchmarks,
            &config.segments,
            scenario,
            config.base_year(),
        );
        let mut segments = BTreeMap::new();
        for (segment, segment_config) in config.segments.iter() {
            let projection = project_segment(
                *segment,
                &engine,
                segment_config,
                &enabled,
                &years,
                company.cash_tax_rate,
                warnings,
            )?;
            segments.insert(*segment, projection);
        }

        // --- Consolidation ---
        let consolidated = consolidate(&segments)?;
        let aggregation = verify_aggregation(&segments, &consolidated);
        if !aggregation.passed() {
            tracing::error!(
                scenario = %scenario.name,
                breaches = aggregation.breaches.len(),
                "segment aggregation mismatch"
            );
            warnings.push(format!(
                "Consolidated table differs from segment sums on {} line(s)",
                aggregation.breaches.len()
            ));
        }

        // --- Discount rates ---
        let wacc = cross_border_wacc(&scenario.wacc, scenario.wacc_override, warnings)?;

        // --- Standalone ---
        let mut standalone_terms = ValuationTerms {
            perspective: Perspective::Standalone,
            wacc: scenario.wacc.domestic_wacc,
            terminal_growth: scenario.wacc.terminal_growth,
            exit_multiple: scenario.wacc.exit_multiple,
            shares_outstanding: company.shares_outstanding,
            financing_adjustment: Decimal::ZERO,
        };
        let mut standalone = value(
            &consolidated,
            &standalone_terms,
            &company.bridge,
            None,
            warnings,
        )?;

        let needs_external_funding = enabled.iter().any(|p| !p.project.baseline);
        let financing = if needs_external_funding {
            financing_impact(
                &consolidated,
                &FinancingTerms {
                    existing_debt: company.bridge.total_debt,
                    cost_of_debt: company.cost_of_debt,
                    tax_rate: company.cash_tax_rate,
                    issuance_discount: company.issuance_discount,
                    issue_reference_price: standalone.share_price,
                    wacc: standalone_terms.wacc,
                },
            )?
        } else {
            FinancingImpact::none()
        };
        if !financing.is_zero() {
            standalone_terms.wacc += financing.wacc_penalty;
            standalone_terms.shares_outstanding += financing.new_shares;
            standalone_terms.financing_adjustment = financing.adjustment;
            standalone = value(&consolidated, &standalone_terms, &company.bridge, None, warnings)?;
        }

        // --- Acquirer ---
        let synergies = match &scenario.synergies {
            Some(assumptions) => Some(synergy_npv(
                assumptions,
                &consolidated,
                &SynergyTerms {
                    wacc: wacc.wacc_used,
                    terminal_growth: scenario.wacc.terminal_growth,
                    tax_rate: company.cash_tax_rate,
                    realization: scenario.synergy_realization,
                    integration_cost_multiplier: scenario.integration_cost_multiplier,
                },
            )?),
            None => None,
        };
        let acquirer_terms = ValuationTerms {
            perspective: Perspective::Acquirer,
            wacc: wacc.wacc_used,
            terminal_growth: scenario.wacc.terminal_growth,
            exit_multiple: scenario.wacc.exit_multiple,
            shares_outstanding: company.shares_outstanding,
            financing_adjustment: Decimal::ZERO,
        };
        let acquirer = value(
            &consolidated,
            &acquirer_terms,
            &company.bridge,
            synergies.as_ref(),
            warnings,
        )?;

        tracing::debug!(
            scenario = %scenario.name,
            standalone = %standalone.share_price.round_dp(2),
            acquirer = %acquirer.share_price.round_dp(2),
            acquirer_wacc = %wacc.wacc_used.round_dp(4),
            "analysis complete"
        );

        Ok(AnalysisOutput {
            scenario: scenario.name.clone(),
            base_year: config.base_year(),
            projects: project_names,
            segments,
            consolidated,
            aggregation,
            acquirer_premium: acquirer.share_price - standalone.share_price,
            wacc,
            financing,
            synergies,
            standalone,
            acquirer,
            offer_price: company.offer_price,
        })
    }

    /// Stand-alone economics of every catalog project under `scenario`'s
    /// prices, discounted at the domestic WACC.
    pub fn project_economics(
        &self,
        scenario: &ModelScenario,
    ) -> SteelDcfResult<ComputationOutput<Vec<ProjectEconomics>>> {
        let start = Instant::now();
        scenario.validate()?;
        let config = &self.config;
        let years = config.projection_years();
        let engine = PriceVolumeEngine::new(
            &config.benchmarks,
            &config.segments,
            scenario,
            config.base_year(),
        );

        let mut out = Vec::with_capacity(config.projects.projects.len());
        for project in config.projects.projects.values() {
            let prices = years
                .iter()
                .map(|y| engine.price(project.segment, *y))
                .collect::<SteelDcfResult<Vec<_>>>()?;
            out.push(evaluate_project(
                project,
                &years,
                &prices,
                scenario.wacc.domestic_wacc,
                config.company.cash_tax_rate,
                scenario.execution_factor_for(&project.name),
                scenario.wacc.exit_multiple,
            )?);
        }

        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Project NPV at domestic WACC with terminal EV/EBITDA exit; IRR by Newton-Raphson",
            scenario,
            Vec::new(),
            elapsed,
            out,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::reference_wacc_inputs;
    use crate::projection::capital_projects::{BIG_RIVER_2, GREENFIELD_EAF};
    use rust_decimal_macros::dec;

    fn model() -> ValuationModel {
        ValuationModel::new(ModelConfig::reference()).unwrap()
    }

    fn base() -> ModelScenario {
        ModelScenario::builder("base", reference_wacc_inputs())
            .price_growth(dec!(0.01))
            .build()
            .unwrap()
    }

    #[test]
    fn test_baseline_project_always_included() {
        let out = model().analyze(&base(), &mut Vec::new()).unwrap();
        assert_eq!(out.projects, vec![BIG_RIVER_2.to_string()]);
        assert!(out.financing.is_zero());
        assert!(out.aggregation.passed());
        assert_eq!(out.consolidated.len(), 10);
    }

    #[test]
    fn test_unknown_project_fails_at_entry() {
        let s = base().to_builder().project("atlantis_mill").build().unwrap();
        let err = model().analyze(&s, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, crate::error::SteelDcfError::UnknownProject(_)));
    }

    #[test]
    fn test_envelope_carries_warnings_and_metadata() {
        let s = base().to_builder().wacc_override(Some(dec!(0.08))).build().unwrap();
        let out = model().run_full_analysis(&s).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("overridden")));
        assert_eq!(out.result.wacc.wacc_used, dec!(0.08));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }

    #[test]
    fn test_execution_factor_haircuts_optional_projects_only() {
        let full = base().to_builder().project(GREENFIELD_EAF).build().unwrap();
        let cut = full.to_builder().execution_factor(dec!(0.5)).build().unwrap();
        let m = model();
        let a = m.analyze(&full, &mut Vec::new()).unwrap();
        let b = m.analyze(&cut, &mut Vec::new()).unwrap();
        let mini_a = &a.segments[&Segment::MiniMill].rows;
        let mini_b = &b.segments[&Segment::MiniMill].rows;
        // 2026: only the committed project is producing
        assert_eq!(mini_a[1].lines.project_ebitda, mini_b[1].lines.project_ebitda);
        // 2034: greenfield at full ramp is halved
        assert!(mini_b[9].lines.project_ebitda < mini_a[9].lines.project_ebitda);
    }

    #[test]
    fn test_project_economics_cover_catalog() {
        let out = model().project_economics(&base()).unwrap();
        assert_eq!(out.result.len(), 5);
        assert!(out.result.iter().all(|p| p.total_capex > Decimal::ZERO));
    }
}
