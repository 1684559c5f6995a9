use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::synergies::SynergyValuation;
use crate::error::SteelDcfError;
use crate::projection::consolidation::ConsolidatedYear;
use crate::time_value::{discount_factor, pv_of_annual_flows};
use crate::types::{Money, Multiple, Perspective, Rate};
use crate::SteelDcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Claims between enterprise value and common equity ($M).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityBridge {
    pub total_debt: Money,
    pub pension_obligations: Money,
    pub operating_leases: Money,
    pub cash: Money,
    pub equity_investments: Money,
}

impl EquityBridge {
    /// Amount subtracted from EV (negative when cash exceeds the claims).
    pub fn net_claims(&self) -> Money {
        self.total_debt + self.pension_obligations + self.operating_leases
            - self.cash
            - self.equity_investments
    }
}

/// Discounting terms for one valuation run.
#[derive(Debug, Clone, Copy)]
pub struct ValuationTerms {
    pub perspective: Perspective,
    pub wacc: Rate,
    pub terminal_growth: Rate,
    pub exit_multiple: Multiple,
    /// Millions
    pub shares_outstanding: Decimal,
    /// Standalone financing cost deducted in the bridge ($M)
    pub financing_adjustment: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub perspective: Perspective,
    pub wacc: Rate,
    pub terminal_growth: Rate,
    pub exit_multiple: Multiple,
    pub pv_fcf: Money,
    pub terminal_value_gordon: Money,
    pub pv_terminal_value_gordon: Money,
    pub terminal_value_exit: Money,
    pub pv_terminal_value_exit: Money,
    pub enterprise_value_gordon: Money,
    pub enterprise_value_exit: Money,
    /// Mean of the two EV estimates plus synergy NPV
    pub enterprise_value: Money,
    pub synergy_npv: Money,
    pub total_debt: Money,
    pub pension_obligations: Money,
    pub operating_leases: Money,
    pub cash: Money,
    pub equity_investments: Money,
    pub financing_adjustment: Money,
    /// Before the floor; negative in distressed cases
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    /// $/share, never negative
    pub share_price: Money,
    /// Share of blended EV (ex synergies) coming from terminal value
    pub terminal_value_share: Rate,
    /// Perpetual growth rate implied by the exit-multiple terminal value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_perpetuity_growth: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Discount a consolidated projection and walk EV down to a share price.
///
/// Synergies may only be supplied for the acquirer perspective.
pub fn value(
    table: &[ConsolidatedYear],
    terms: &ValuationTerms,
    bridge: &EquityBridge,
    synergies: Option<&SynergyValuation>,
    warnings: &mut Vec<String>,
) -> SteelDcfResult<ValuationResult> {
    validate_terms(terms)?;
    if terms.perspective == Perspective::Standalone && synergies.is_some() {
        return Err(SteelDcfError::invalid(
            "synergies",
            "Synergies apply to the acquirer valuation only",
        ));
    }
    let last = table.last().ok_or_else(|| {
        SteelDcfError::InsufficientData("No projection years to value".into())
    })?;
    let horizon = table.len() as u32;

    // --- PV of explicit cash flows ---
    let fcf: Vec<Money> = table.iter().map(|row| row.lines.fcf).collect();
    let pv_fcf = pv_of_annual_flows(terms.wacc, &fcf)?;

    // --- Terminal values ---
    let g = terms.terminal_growth;
    let terminal_value_gordon = last.lines.fcf * (Decimal::ONE + g) / (terms.wacc - g);
    let terminal_value_exit = last.lines.ebitda * terms.exit_multiple;
    let tv_df = discount_factor(terms.wacc, horizon)?;
    let pv_terminal_value_gordon = terminal_value_gordon * tv_df;
    let pv_terminal_value_exit = terminal_value_exit * tv_df;

    if terminal_value_gordon > Decimal::ZERO && terminal_value_exit > Decimal::ZERO {
        let gap = ((terminal_value_gordon - terminal_value_exit) / terminal_value_gordon).abs();
        if gap > dec!(0.50) {
            warnings.push(format!(
                "{:?}: Gordon TV ({}) and exit-multiple TV ({}) differ by {:.1}%",
                terms.perspective,
                terminal_value_gordon.round_dp(1),
                terminal_value_exit.round_dp(1),
                gap * dec!(100)
            ));
        }
    }

    // --- Enterprise value ---
    let enterprise_value_gordon = pv_fcf + pv_terminal_value_gordon;
    let enterprise_value_exit = pv_fcf + pv_terminal_value_exit;
    let blended = (enterprise_value_gordon + enterprise_value_exit) / dec!(2);
    let synergy_npv = synergies.map(|s| s.npv).unwrap_or(Decimal::ZERO);
    let enterprise_value = blended + synergy_npv;

    let terminal_value_share = if blended.is_zero() {
        Decimal::ZERO
    } else {
        (pv_terminal_value_gordon + pv_terminal_value_exit) / dec!(2) / blended
    };

    // g = (TV * wacc - FCF) / (TV + FCF)
    let implied_denominator = terminal_value_exit + last.lines.fcf;
    let implied_perpetuity_growth = if implied_denominator.is_zero() {
        None
    } else {
        Some((terminal_value_exit * terms.wacc - last.lines.fcf) / implied_denominator)
    };

    // --- Equity bridge ---
    let equity_value = enterprise_value - bridge.net_claims() - terms.financing_adjustment;
    let share_price = equity_value.max(Decimal::ZERO) / terms.shares_outstanding;
    if equity_value < Decimal::ZERO {
        warnings.push(format!(
            "{:?}: equity value {} is negative; share price floored at 0",
            terms.perspective,
            equity_value.round_dp(1)
        ));
    }

    Ok(ValuationResult {
        perspective: terms.perspective,
        wacc: terms.wacc,
        terminal_growth: terms.terminal_growth,
        exit_multiple: terms.exit_multiple,
        pv_fcf,
        terminal_value_gordon,
        pv_terminal_value_gordon,
        terminal_value_exit,
        pv_terminal_value_exit,
        enterprise_value_gordon,
        enterprise_value_exit,
        enterprise_value,
        synergy_npv,
        total_debt: bridge.total_debt,
        pension_obligations: bridge.pension_obligations,
        operating_leases: bridge.operating_leases,
        cash: bridge.cash,
        equity_investments: bridge.equity_investments,
        financing_adjustment: terms.financing_adjustment,
        equity_value,
        shares_outstanding: terms.shares_outstanding,
        share_price,
        terminal_value_share,
        implied_perpetuity_growth,
    })
}

fn validate_terms(terms: &ValuationTerms) -> SteelDcfResult<()> {
    if terms.wacc <= Decimal::ZERO {
        return Err(SteelDcfError::invalid("wacc", "WACC must be positive"));
    }
    if terms.terminal_growth >= terms.wacc {
        return Err(SteelDcfError::FinancialImpossibility(format!(
            "Terminal growth rate ({}) must be less than WACC ({})",
            terms.terminal_growth, terms.wacc
        )));
    }
    if terms.exit_multiple < Decimal::ZERO {
        return Err(SteelDcfError::invalid("exit_multiple", "Exit multiple cannot be negative"));
    }
    if terms.shares_outstanding <= Decimal::ZERO {
        return Err(SteelDcfError::invalid(
            "shares_outstanding",
            "Shares outstanding must be positive",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
