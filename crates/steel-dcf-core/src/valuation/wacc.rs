use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SteelDcfError;
use crate::types::{with_metadata, ComputationOutput, Currency, Multiple, Rate};
use crate::SteelDcfResult;

// ---------------------------------------------------------------------------
// Domestic CAPM build-up
// ---------------------------------------------------------------------------

/// Input parameters for a domestic CAPM-based WACC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Risk-free rate (10-year government bond yield)
    pub risk_free_rate: Rate,
    /// Equity risk premium (market return minus risk-free rate)
    pub equity_risk_premium: Rate,
    /// Levered beta of equity
    pub beta: Decimal,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    /// Marginal corporate tax rate
    pub tax_rate: Rate,
    /// Weight of debt in capital structure (market value basis)
    pub debt_weight: Rate,
    /// Weight of equity in capital structure (market value basis)
    pub equity_weight: Rate,
    /// Small-cap / size premium
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_premium: Option<Rate>,
    /// Company-specific risk premium (e.g. cyclicality, legacy liabilities)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_risk_premium: Option<Rate>,
}

/// Output of the WACC calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub cost_of_debt_pretax: Rate,
}

/// Calculate a domestic acquirer's WACC using CAPM.
///
/// Ke = Rf + Beta * ERP + size_premium + specific_risk
/// WACC = Ke * We + Kd * (1 - t) * Wd
pub fn calculate_wacc(input: &WaccInput) -> SteelDcfResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_wacc_input(input)?;

    let weight_sum = input.debt_weight + input.equity_weight;
    if (weight_sum - Decimal::ONE).abs() > dec!(0.01) {
        return Err(SteelDcfError::invalid(
            "debt_weight + equity_weight",
            format!("Capital structure weights must sum to 1.0, got {weight_sum}"),
        ));
    }

    let mut cost_of_equity = input.risk_free_rate + input.beta * input.equity_risk_premium;
    if let Some(sp) = input.size_premium {
        cost_of_equity += sp;
    }
    if let Some(srp) = input.specific_risk_premium {
        cost_of_equity += srp;
    }

    let after_tax_cost_of_debt = input.cost_of_debt * (Decimal::ONE - input.tax_rate);
    let wacc = cost_of_equity * input.equity_weight + after_tax_cost_of_debt * input.debt_weight;

    if input.beta > dec!(2.5) {
        warnings.push(format!(
            "High beta ({}): verify market data for a cyclical producer",
            input.beta
        ));
    }
    if wacc > dec!(0.20) {
        warnings.push(format!("WACC of {wacc} exceeds 20%"));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        cost_of_debt_pretax: input.cost_of_debt,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "WACC via CAPM build-up",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_wacc_input(input: &WaccInput) -> SteelDcfResult<()> {
    if input.risk_free_rate < Decimal::ZERO {
        return Err(SteelDcfError::invalid("risk_free_rate", "Risk-free rate cannot be negative"));
    }
    if input.equity_risk_premium < Decimal::ZERO {
        return Err(SteelDcfError::invalid(
            "equity_risk_premium",
            "Equity risk premium cannot be negative",
        ));
    }
    if input.beta <= Decimal::ZERO {
        return Err(SteelDcfError::invalid("beta", "Beta must be positive"));
    }
    if input.cost_of_debt < Decimal::ZERO {
        return Err(SteelDcfError::invalid("cost_of_debt", "Cost of debt cannot be negative"));
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(SteelDcfError::invalid("tax_rate", "Tax rate must be between 0 and 1"));
    }
    if input.debt_weight < Decimal::ZERO || input.equity_weight < Decimal::ZERO {
        return Err(SteelDcfError::invalid(
            "debt_weight / equity_weight",
            "Capital structure weights cannot be negative",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scenario discount-rate inputs
// ---------------------------------------------------------------------------

/// Discount-rate assumptions carried by every scenario.
///
/// `home_*` fields describe the foreign acquirer in its own currency;
/// `target_risk_free` is the target currency's 10-year government yield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaccInputs {
    /// Domestic (standalone) acquirer's WACC in the target currency
    pub domestic_wacc: Rate,
    pub terminal_growth: Rate,
    pub exit_multiple: Multiple,
    pub home_risk_free: Rate,
    pub target_risk_free: Rate,
    pub home_equity_risk_premium: Rate,
    pub home_credit_spread: Rate,
    pub home_tax_rate: Rate,
    /// Debt / (debt + equity) of the foreign acquirer
    pub home_debt_ratio: Rate,
    #[serde(default = "default_home_currency")]
    pub home_currency: Currency,
    #[serde(default)]
    pub target_currency: Currency,
}

fn default_home_currency() -> Currency {
    Currency::JPY
}

impl WaccInputs {
    pub fn validate(&self) -> SteelDcfResult<()> {
        if self.domestic_wacc <= Decimal::ZERO {
            return Err(SteelDcfError::invalid("wacc.domestic_wacc", "WACC must be positive"));
        }
        if self.terminal_growth >= self.domestic_wacc {
            return Err(SteelDcfError::FinancialImpossibility(format!(
                "Terminal growth rate ({}) must be less than the domestic WACC ({})",
                self.terminal_growth, self.domestic_wacc
            )));
        }
        if self.exit_multiple <= Decimal::ZERO {
            return Err(SteelDcfError::invalid(
                "wacc.exit_multiple",
                "Exit multiple must be positive",
            ));
        }
        if self.home_risk_free <= dec!(-1) || self.target_risk_free <= dec!(-1) {
            return Err(SteelDcfError::invalid(
                "wacc.home_risk_free / wacc.target_risk_free",
                "Risk-free rates must be greater than -100%",
            ));
        }
        if self.home_tax_rate < Decimal::ZERO || self.home_tax_rate > Decimal::ONE {
            return Err(SteelDcfError::invalid(
                "wacc.home_tax_rate",
                "Tax rate must be between 0 and 1",
            ));
        }
        if self.home_debt_ratio < Decimal::ZERO || self.home_debt_ratio >= Decimal::ONE {
            return Err(SteelDcfError::invalid(
                "wacc.home_debt_ratio",
                "Debt ratio must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cross-border conversion
// ---------------------------------------------------------------------------

/// Breakdown of the foreign acquirer's discount rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossBorderWacc {
    pub home_currency: Currency,
    pub target_currency: Currency,
    pub home_cost_of_equity: Rate,
    pub home_cost_of_debt: Rate,
    pub home_after_tax_cost_of_debt: Rate,
    pub home_equity_weight: Rate,
    pub home_debt_weight: Rate,
    /// WACC in the acquirer's home currency
    pub home_wacc: Rate,
    /// Home WACC converted to the target currency via interest-rate parity
    pub irp_wacc: Rate,
    /// Manual override, if the scenario supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_wacc: Option<Rate>,
    /// Rate actually used for the acquirer valuation
    pub wacc_used: Rate,
    pub domestic_wacc: Rate,
    /// Domestic WACC minus the rate used (positive = acquirer advantage)
    pub wacc_advantage: Rate,
}

/// Convert a home-currency rate to the target currency:
/// (1 + r_home) * (1 + rf_target) / (1 + rf_home) - 1.
pub fn irp_convert(
    home_rate: Rate,
    home_risk_free: Rate,
    target_risk_free: Rate,
) -> SteelDcfResult<Rate> {
    let denom = Decimal::ONE + home_risk_free;
    if denom <= Decimal::ZERO {
        return Err(SteelDcfError::DivisionByZero {
            context: "interest-rate parity (1 + home risk-free rate)".into(),
        });
    }
    Ok((Decimal::ONE + home_rate) * (Decimal::ONE + target_risk_free) / denom - Decimal::ONE)
}

/// Compute the foreign acquirer's WACC in its home currency and translate it
/// into the target currency.
///
/// The IRP value is always computed; an override only replaces `wacc_used`.
pub fn cross_border_wacc(
    inputs: &WaccInputs,
    wacc_override: Option<Rate>,
    warnings: &mut Vec<String>,
) -> SteelDcfResult<CrossBorderWacc> {
    inputs.validate()?;

    let home_cost_of_equity = inputs.home_risk_free + inputs.home_equity_risk_premium;
    let home_cost_of_debt = inputs.home_risk_free + inputs.home_credit_spread;
    let home_after_tax_cost_of_debt = home_cost_of_debt * (Decimal::ONE - inputs.home_tax_rate);
    let home_debt_weight = inputs.home_debt_ratio;
    let home_equity_weight = Decimal::ONE - home_debt_weight;
    let home_wacc =
        home_equity_weight * home_cost_of_equity + home_debt_weight * home_after_tax_cost_of_debt;

    let irp_wacc = irp_convert(home_wacc, inputs.home_risk_free, inputs.target_risk_free)?;

    let wacc_used = match wacc_override {
        Some(manual) => {
            if manual <= Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    "wacc_override",
                    "Override WACC must be positive",
                ));
            }
            warnings.push(format!(
                "Acquirer WACC overridden to {manual} (IRP-derived value {irp_wacc} retained for audit)"
            ));
            manual
        }
        None => irp_wacc,
    };

    let structurally_lower = inputs.home_risk_free < inputs.target_risk_free;
    if structurally_lower && wacc_used >= inputs.domestic_wacc {
        let msg = format!(
            "Acquirer WACC ({wacc_used}) is not below the domestic WACC ({}) despite lower home rates",
            inputs.domestic_wacc
        );
        tracing::warn!("{msg}");
        warnings.push(msg);
    }

    Ok(CrossBorderWacc {
        home_currency: inputs.home_currency.clone(),
        target_currency: inputs.target_currency.clone(),
        home_cost_of_equity,
        home_cost_of_debt,
        home_after_tax_cost_of_debt,
        home_equity_weight,
        home_debt_weight,
        home_wacc,
        irp_wacc,
        override_wacc: wacc_override,
        wacc_used,
        domestic_wacc: inputs.domestic_wacc,
        wacc_advantage: inputs.domestic_wacc - wacc_used,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
