use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::SteelDcfError;
use crate::model::analysis::ValuationModel;
use crate::model::scenario::ModelScenario;
use crate::types::*;
use crate::valuation::dcf::{value, ValuationTerms};
use crate::valuation::synergies::{synergy_npv, SynergyTerms};
use crate::SteelDcfResult;

/// Second axis of a WACC sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    TerminalGrowth,
    ExitMultiple,
}

/// Input for a WACC x (terminal growth | exit multiple) share-price grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub perspective: Perspective,
    pub wacc: SensitivityVariable,
    pub axis: SweepAxis,
    pub second: SensitivityVariable,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: String,
    /// Matrix[i][j] = output when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j]
    pub matrix: Vec<Vec<Decimal>>,
    /// Output at the grid point nearest the scenario's own inputs
    pub base_case_value: Decimal,
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> SteelDcfResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(SteelDcfError::invalid(
            format!("variable:{}", var.name),
            "Step must be positive",
        ));
    }
    if var.min > var.max {
        return Err(SteelDcfError::invalid(
            format!("variable:{}", var.name),
            "Min must be <= max",
        ));
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a 2-way grid with a caller-supplied model function.
///
/// Cells where `eval_fn` fails (e.g. growth at or above WACC) are reported as
/// warnings and hold 0.
pub fn evaluate_sensitivity<F>(
    variable_1: &SensitivityVariable,
    variable_2: &SensitivityVariable,
    output_metric: &str,
    base_point: (Decimal, Decimal),
    eval_fn: F,
) -> SteelDcfResult<ComputationOutput<SensitivityOutput>>
where
    F: Fn(Decimal, Decimal) -> SteelDcfResult<Decimal>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let v1_values = generate_sweep_values(variable_1)?;
    let v2_values = generate_sweep_values(variable_2)?;

    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match eval_fn(*v1, *v2) {
                Ok(val) => row.push(val),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(Decimal::ZERO);
                }
            }
        }
        matrix.push(row);
    }

    let base_row = closest_index(&v1_values, base_point.0);
    let base_col = closest_index(&v2_values, base_point.1);
    let base_case_value = matrix[base_row][base_col];

    let output = SensitivityOutput {
        variable_1_name: variable_1.name.clone(),
        variable_2_name: variable_2.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: output_metric.to_string(),
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis (Evaluated)",
        &serde_json::json!({
            "variable_1": variable_1.name,
            "variable_2": variable_2.name,
            "output_metric": output_metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Share-price grid over discount rate and one terminal-value driver.
///
/// The projection is run once; each cell only re-discounts it. Standalone
/// cells keep the scenario's financing cost and dilution, acquirer cells
/// re-value synergies at the swept rate.
pub fn wacc_sensitivity(
    model: &ValuationModel,
    scenario: &ModelScenario,
    input: &SensitivityInput,
) -> SteelDcfResult<ComputationOutput<SensitivityOutput>> {
    let base = model.analyze(scenario, &mut Vec::new())?;
    let company = &model.config().company;

    let (base_result, penalty, shares, adjustment) = match input.perspective {
        Perspective::Standalone => (
            &base.standalone,
            base.financing.wacc_penalty,
            company.shares_outstanding + base.financing.new_shares,
            base.financing.adjustment,
        ),
        Perspective::Acquirer => (
            &base.acquirer,
            Decimal::ZERO,
            company.shares_outstanding,
            Decimal::ZERO,
        ),
    };
    let second_base = match input.axis {
        SweepAxis::TerminalGrowth => base_result.terminal_growth,
        SweepAxis::ExitMultiple => base_result.exit_multiple,
    };

    let eval = |wacc: Decimal, second: Decimal| -> SteelDcfResult<Decimal> {
        let (terminal_growth, exit_multiple) = match input.axis {
            SweepAxis::TerminalGrowth => (second, scenario.wacc.exit_multiple),
            SweepAxis::ExitMultiple => (scenario.wacc.terminal_growth, second),
        };
        let terms = ValuationTerms {
            perspective: input.perspective,
            wacc: wacc + penalty,
            terminal_growth,
            exit_multiple,
            shares_outstanding: shares,
            financing_adjustment: adjustment,
        };
        let synergies = match (&scenario.synergies, input.perspective) {
            (Some(assumptions), Perspective::Acquirer) => Some(synergy_npv(
                assumptions,
                &base.consolidated,
                &SynergyTerms {
                    wacc,
                    terminal_growth,
                    tax_rate: company.cash_tax_rate,
                    realization: scenario.synergy_realization,
                    integration_cost_multiplier: scenario.integration_cost_multiplier,
                },
            )?),
            _ => None,
        };
        let result = value(
            &base.consolidated,
            &terms,
            &company.bridge,
            synergies.as_ref(),
            &mut Vec::new(),
        )?;
        Ok(result.share_price)
    };

    evaluate_sensitivity(
        &input.wacc,
        &input.second,
        &format!("{:?} share price", input.perspective),
        (base_result.wacc - penalty, second_base),
        eval,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{reference_wacc_inputs, ModelConfig};
    use rust_decimal_macros::dec;

    fn var(name: &str, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable {
            name: name.into(),
            min,
            max,
            step,
        }
    }

    #[test]
    fn test_sweep_values_include_max() {
        let v = generate_sweep_values(&var("x", dec!(0), dec!(1), dec!(0.3))).unwrap();
        assert_eq!(v, vec![dec!(0), dec!(0.3), dec!(0.6), dec!(0.9), dec!(1)]);
    }

    #[test]
    fn test_bad_step_rejected() {
        assert!(generate_sweep_values(&var("x", dec!(0), dec!(1), dec!(0))).is_err());
    }

    #[test]
    fn test_grid_shape_and_base_value() {
        let out = evaluate_sensitivity(
            &var("a", dec!(1), dec!(3), dec!(1)),
            &var("b", dec!(10), dec!(20), dec!(10)),
            "sum",
            (dec!(2), dec!(20)),
            |a, b| Ok(a + b),
        )
        .unwrap()
        .result;
        assert_eq!(out.matrix.len(), 3);
        assert_eq!(out.matrix[0].len(), 2);
        assert_eq!(out.base_case_position, (1, 1));
        assert_eq!(out.base_case_value, dec!(22));
    }

    #[test]
    fn test_wacc_grid_decreases_along_rate_axis() {
        let model = ValuationModel::new(ModelConfig::reference()).unwrap();
        let scenario = ModelScenario::builder("base", reference_wacc_inputs()).build().unwrap();
        let input = SensitivityInput {
            perspective: Perspective::Standalone,
            wacc: var("wacc", dec!(0.08), dec!(0.14), dec!(0.02)),
            axis: SweepAxis::ExitMultiple,
            second: var("exit_multiple", dec!(4), dec!(6), dec!(1)),
        };
        let out = wacc_sensitivity(&model, &scenario, &input).unwrap();
        let m = &out.result.matrix;
        for col in 0..m[0].len() {
            for row in 1..m.len() {
                assert!(m[row][col] <= m[row - 1][col]);
            }
        }
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_growth_above_rate_reported_not_fatal() {
        let model = ValuationModel::new(ModelConfig::reference()).unwrap();
        let scenario = ModelScenario::builder("base", reference_wacc_inputs()).build().unwrap();
        let input = SensitivityInput {
            perspective: Perspective::Acquirer,
            wacc: var("wacc", dec!(0.02), dec!(0.06), dec!(0.02)),
            axis: SweepAxis::TerminalGrowth,
            second: var("terminal_growth", dec!(0.01), dec!(0.03), dec!(0.01)),
        };
        let out = wacc_sensitivity(&model, &scenario, &input).unwrap();
        assert!(!out.warnings.is_empty());
        assert_eq!(out.result.matrix[0][2], Decimal::ZERO);
    }
}
