use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::projection::consolidation::ConsolidatedYear;
use crate::time_value::discount_factor;
use crate::types::{Money, Rate};
use crate::SteelDcfResult;

// ---------------------------------------------------------------------------
// Assumptions
// ---------------------------------------------------------------------------

/// Cost savings at full run-rate ($M per year) with a confidence for each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingSynergies {
    pub procurement: Money,
    pub procurement_confidence: Rate,
    pub logistics: Money,
    pub logistics_confidence: Rate,
    pub overhead: Money,
    pub overhead_confidence: Rate,
}

impl OperatingSynergies {
    pub fn risked_run_rate(&self) -> Money {
        self.procurement * self.procurement_confidence
            + self.logistics * self.logistics_confidence
            + self.overhead * self.overhead_confidence
    }
}

/// Process know-how brought by the acquirer, as fractions of the target's
/// cost base (yield, cost) or revenue (quality premium).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyTransfer {
    pub yield_improvement: Rate,
    pub quality_premium: Rate,
    pub cost_reduction: Rate,
    pub confidence: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSynergies {
    /// Incremental revenue at run-rate ($M)
    pub cross_sell_revenue: Money,
    pub mix_uplift_revenue: Money,
    /// EBITDA margin earned on the incremental revenue
    pub margin: Rate,
    pub confidence: Rate,
}

impl RevenueSynergies {
    pub fn risked_ebitda(&self) -> Money {
        (self.cross_sell_revenue + self.mix_uplift_revenue) * self.margin * self.confidence
    }
}

/// One-time costs to integrate the target ($M).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationCosts {
    pub it_systems: Money,
    pub restructuring: Money,
    pub advisory: Money,
    pub other: Money,
    /// Fraction of the total spent in projection year 1, 2, ...
    pub spend_profile: Vec<Rate>,
}

impl IntegrationCosts {
    pub fn total(&self) -> Money {
        self.it_systems + self.restructuring + self.advisory + self.other
    }

    pub fn spend_in(&self, period: usize) -> Rate {
        period
            .checked_sub(1)
            .and_then(|i| self.spend_profile.get(i))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Share of run-rate synergies achieved in projection year 1, 2, ...
/// The last value holds for every later year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyRampSchedule {
    pub by_year: Vec<Rate>,
}

impl SynergyRampSchedule {
    pub fn fraction(&self, period: usize) -> Rate {
        match period.checked_sub(1) {
            Some(i) => self
                .by_year
                .get(i)
                .or_else(|| self.by_year.last())
                .copied()
                .unwrap_or(Decimal::ZERO),
            None => Decimal::ZERO,
        }
    }
}

impl Default for SynergyRampSchedule {
    fn default() -> Self {
        Self {
            by_year: vec![dec!(0.25), dec!(0.50), dec!(0.75), Decimal::ONE],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynergyAssumptions {
    pub operating: OperatingSynergies,
    pub technology: TechnologyTransfer,
    pub revenue: RevenueSynergies,
    pub integration: IntegrationCosts,
    pub ramp: SynergyRampSchedule,
}

impl SynergyAssumptions {
    pub fn validate(&self) -> SteelDcfResult<()> {
        let unit = |field: &str, v: Rate| -> SteelDcfResult<()> {
            if v < Decimal::ZERO || v > Decimal::ONE {
                return Err(SteelDcfError::invalid(
                    format!("synergies.{field}"),
                    "Must be between 0 and 1",
                ));
            }
            Ok(())
        };
        let non_negative = |field: &str, v: Money| -> SteelDcfResult<()> {
            if v < Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    format!("synergies.{field}"),
                    "Cannot be negative",
                ));
            }
            Ok(())
        };

        let op = &self.operating;
        non_negative("operating.procurement", op.procurement)?;
        non_negative("operating.logistics", op.logistics)?;
        non_negative("operating.overhead", op.overhead)?;
        unit("operating.procurement_confidence", op.procurement_confidence)?;
        unit("operating.logistics_confidence", op.logistics_confidence)?;
        unit("operating.overhead_confidence", op.overhead_confidence)?;

        let tech = &self.technology;
        unit("technology.yield_improvement", tech.yield_improvement)?;
        unit("technology.quality_premium", tech.quality_premium)?;
        unit("technology.cost_reduction", tech.cost_reduction)?;
        unit("technology.confidence", tech.confidence)?;

        let rev = &self.revenue;
        non_negative("revenue.cross_sell_revenue", rev.cross_sell_revenue)?;
        non_negative("revenue.mix_uplift_revenue", rev.mix_uplift_revenue)?;
        unit("revenue.margin", rev.margin)?;
        unit("revenue.confidence", rev.confidence)?;

        let ic = &self.integration;
        non_negative("integration.it_systems", ic.it_systems)?;
        non_negative("integration.restructuring", ic.restructuring)?;
        non_negative("integration.advisory", ic.advisory)?;
        non_negative("integration.other", ic.other)?;
        for share in &ic.spend_profile {
            unit("integration.spend_profile", *share)?;
        }
        let spent: Rate = ic.spend_profile.iter().copied().sum();
        if ic.total() > Decimal::ZERO && (spent - Decimal::ONE).abs() > dec!(0.001) {
            return Err(SteelDcfError::invalid(
                "synergies.integration.spend_profile",
                format!("Spend profile sums to {spent}, expected 1.0"),
            ));
        }

        if self.ramp.by_year.is_empty() {
            return Err(SteelDcfError::invalid("synergies.ramp", "Ramp schedule cannot be empty"));
        }
        for fraction in &self.ramp.by_year {
            unit("ramp.by_year", *fraction)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Pre-tax synergy EBITDA and integration spend for one projection year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyYear {
    pub year: i32,
    pub ramp: Rate,
    pub operating: Money,
    pub technology: Money,
    pub revenue: Money,
    pub total_ebitda: Money,
    pub integration_cost: Money,
    pub after_tax_cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynergyValuation {
    pub annual: Vec<SynergyYear>,
    pub pv_synergies: Money,
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    pub pv_integration_costs: Money,
    /// PV of synergies + PV of terminal value - PV of integration costs
    pub npv: Money,
}

/// Scaling knobs applied on top of the modeled synergies.
#[derive(Debug, Clone, Copy)]
pub struct SynergyTerms {
    pub wacc: Rate,
    pub terminal_growth: Rate,
    pub tax_rate: Rate,
    pub realization: Rate,
    pub integration_cost_multiplier: Rate,
}

/// NPV of ramped, after-tax synergies on the target's projected cost base,
/// less after-tax integration costs.
pub fn synergy_npv(
    assumptions: &SynergyAssumptions,
    table: &[ConsolidatedYear],
    terms: &SynergyTerms,
) -> SteelDcfResult<SynergyValuation> {
    if table.is_empty() {
        return Err(SteelDcfError::InsufficientData(
            "synergy valuation needs a projection table".into(),
        ));
    }
    if terms.terminal_growth >= terms.wacc {
        return Err(SteelDcfError::FinancialImpossibility(format!(
            "Terminal growth rate ({}) must be less than WACC ({}) for synergy terminal value",
            terms.terminal_growth, terms.wacc
        )));
    }

    let after_tax = Decimal::ONE - terms.tax_rate;
    let tech = &assumptions.technology;
    let integration_total = assumptions.integration.total() * terms.integration_cost_multiplier;

    let mut annual = Vec::with_capacity(table.len());
    let mut pv_synergies = Decimal::ZERO;
    let mut pv_integration_costs = Decimal::ZERO;
    let mut last_after_tax_synergy = Decimal::ZERO;

    for (idx, row) in table.iter().enumerate() {
        let period = idx + 1;
        let df = discount_factor(terms.wacc, period as u32)?;
        let ramp = assumptions.ramp.fraction(period);
        let scale = ramp * terms.realization;

        let cogs = row.lines.revenue - row.lines.ebitda;
        let operating = assumptions.operating.risked_run_rate() * scale;
        let technology = (cogs * (tech.yield_improvement + tech.cost_reduction)
            + row.lines.revenue * tech.quality_premium)
            * tech.confidence
            * scale;
        let revenue = assumptions.revenue.risked_ebitda() * scale;
        let total_ebitda = operating + technology + revenue;
        let integration_cost = integration_total * assumptions.integration.spend_in(period);

        let after_tax_synergy = total_ebitda * after_tax;
        let after_tax_cost = integration_cost * after_tax;
        pv_synergies += after_tax_synergy * df;
        pv_integration_costs += after_tax_cost * df;
        last_after_tax_synergy = after_tax_synergy;

        annual.push(SynergyYear {
            year: row.year,
            ramp,
            operating,
            technology,
            revenue,
            total_ebitda,
            integration_cost,
            after_tax_cash_flow: after_tax_synergy - after_tax_cost,
        });
    }

    let terminal_value = last_after_tax_synergy * (Decimal::ONE + terms.terminal_growth)
        / (terms.wacc - terms.terminal_growth);
    let pv_terminal_value = terminal_value * discount_factor(terms.wacc, table.len() as u32)?;

    Ok(SynergyValuation {
        annual,
        pv_synergies,
        terminal_value,
        pv_terminal_value,
        pv_integration_costs,
        npv: pv_synergies + pv_terminal_value - pv_integration_costs,
    })
}
