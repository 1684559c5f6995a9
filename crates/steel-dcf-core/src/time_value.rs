use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::SteelDcfError;
use crate::types::{Money, Rate};
use crate::SteelDcfResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// End-of-year discount factor for projection year `period` (1-indexed).
pub fn discount_factor(rate: Rate, period: u32) -> SteelDcfResult<Rate> {
    if rate <= dec!(-1) {
        return Err(SteelDcfError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    let compounded = (Decimal::ONE + rate).powi(i64::from(period));
    if compounded.is_zero() {
        return Err(SteelDcfError::DivisionByZero {
            context: format!("discount factor at period {period}"),
        });
    }
    Ok(Decimal::ONE / compounded)
}

/// Net Present Value of a series of cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> SteelDcfResult<Money> {
    if rate <= dec!(-1) {
        return Err(SteelDcfError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(SteelDcfError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// Present value of flows received at the end of projection years 1..=n.
pub fn pv_of_annual_flows(rate: Rate, flows: &[Money]) -> SteelDcfResult<Money> {
    let mut total = Decimal::ZERO;
    for (idx, cf) in flows.iter().enumerate() {
        total += cf * discount_factor(rate, idx as u32 + 1)?;
    }
    Ok(total)
}

/// Internal Rate of Return using Newton-Raphson
pub fn irr(cash_flows: &[Money], guess: Rate) -> SteelDcfResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(SteelDcfError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !has_outflow || !has_inflow {
        return Err(SteelDcfError::FinancialImpossibility(
            "IRR requires at least one negative and one positive cash flow".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let mut npv_val = Decimal::ZERO;
        let mut dnpv = Decimal::ZERO;
        let one_plus_r = Decimal::ONE + rate;

        for (t, cf) in cash_flows.iter().enumerate() {
            let discount = one_plus_r.powi(t as i64);
            if discount.is_zero() {
                continue;
            }
            npv_val += cf / discount;
            if t > 0 {
                dnpv -= Decimal::from(t as i64) * cf / (discount * one_plus_r);
            }
        }

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(SteelDcfError::ConvergenceFailure {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        rate -= npv_val / dnpv;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(10.0) {
            rate = dec!(10.0);
        }
    }

    Err(SteelDcfError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: npv(rate, cash_flows).unwrap_or(Decimal::MAX),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_discount_factor_year_two() {
        let df = discount_factor(dec!(0.10), 2).unwrap();
        assert!((df - dec!(0.826446281)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_annual_flows_start_at_year_one() {
        let pv = pv_of_annual_flows(dec!(0.10), &[dec!(110)]).unwrap();
        assert!((pv - dec!(100)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_requires_sign_change() {
        let cfs = vec![dec!(100), dec!(100)];
        assert!(irr(&cfs, dec!(0.10)).is_err());
    }
}
