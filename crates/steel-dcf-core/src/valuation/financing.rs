use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::projection::consolidation::ConsolidatedYear;
use crate::time_value::discount_factor;
use crate::types::{Money, Multiple, Rate};
use crate::SteelDcfResult;

const DEBT_SHARE_OF_GAP: Rate = dec!(0.5);

/// (max debt / EBITDA, WACC penalty) tiers; anything above the last bound
/// takes [`TOP_TIER_PENALTY`].
const LEVERAGE_TIERS: [(Multiple, Rate); 3] = [
    (dec!(2.0), dec!(0.0)),
    (dec!(3.0), dec!(0.0025)),
    (dec!(4.0), dec!(0.0050)),
];
const TOP_TIER_PENALTY: Rate = dec!(0.0100);

/// Inputs describing how a standalone owner would fund a cash shortfall.
#[derive(Debug, Clone, Copy)]
pub struct FinancingTerms {
    pub existing_debt: Money,
    pub cost_of_debt: Rate,
    pub tax_rate: Rate,
    /// Discount to the pre-financing share price on new equity (0.10 = 10%)
    pub issuance_discount: Rate,
    /// Standalone share price before financing effects
    pub issue_reference_price: Money,
    pub wacc: Rate,
}

/// How a standalone owner pays for the enabled capital program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancingImpact {
    /// Sum of negative FCF years ($M)
    pub financing_gap: Money,
    pub new_debt: Money,
    pub new_equity: Money,
    pub pro_forma_debt: Money,
    /// Pro-forma debt over average projected EBITDA
    pub pro_forma_leverage: Multiple,
    /// Annual interest on the new debt ($M)
    pub incremental_interest: Money,
    pub pv_after_tax_interest: Money,
    pub wacc_penalty: Rate,
    pub issue_price: Money,
    /// Millions of shares
    pub new_shares: Decimal,
    /// Value handed to new shareholders through the issuance discount ($M)
    pub issuance_discount_cost: Money,
    /// Deducted in the standalone equity bridge ($M)
    pub adjustment: Money,
}

impl FinancingImpact {
    /// No external funding needed.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.adjustment.is_zero() && self.wacc_penalty.is_zero() && self.new_shares.is_zero()
    }
}

/// WACC penalty for a debt / EBITDA multiple.
pub fn leverage_penalty(leverage: Multiple) -> Rate {
    LEVERAGE_TIERS
        .iter()
        .find(|(bound, _)| leverage <= *bound)
        .map(|(_, penalty)| *penalty)
        .unwrap_or(TOP_TIER_PENALTY)
}

/// Cost to a standalone owner of funding the years where the capital
/// program pushes FCF below zero.
///
/// The gap is split evenly between new debt and new equity; interest on the
/// new debt is charged from year 1 and equity is issued at a discount to the
/// pre-financing share price.
pub fn financing_impact(
    table: &[ConsolidatedYear],
    terms: &FinancingTerms,
) -> SteelDcfResult<FinancingImpact> {
    if table.is_empty() {
        return Err(SteelDcfError::InsufficientData(
            "financing impact needs a projection table".into(),
        ));
    }

    let financing_gap: Money = table
        .iter()
        .map(|row| (-row.lines.fcf).max(Decimal::ZERO))
        .sum();
    if financing_gap.is_zero() {
        return Ok(FinancingImpact::none());
    }

    let new_debt = financing_gap * DEBT_SHARE_OF_GAP;
    let new_equity = financing_gap - new_debt;
    let pro_forma_debt = terms.existing_debt + new_debt;

    let average_ebitda =
        table.iter().map(|row| row.lines.ebitda).sum::<Money>() / Decimal::from(table.len());
    let (pro_forma_leverage, wacc_penalty) = if average_ebitda > Decimal::ZERO {
        let leverage = pro_forma_debt / average_ebitda;
        (leverage, leverage_penalty(leverage))
    } else {
        (Decimal::ZERO, TOP_TIER_PENALTY)
    };

    let incremental_interest = new_debt * terms.cost_of_debt;
    let after_tax_interest = incremental_interest * (Decimal::ONE - terms.tax_rate);
    let mut pv_after_tax_interest = Decimal::ZERO;
    for period in 1..=table.len() {
        pv_after_tax_interest += after_tax_interest * discount_factor(terms.wacc, period as u32)?;
    }

    let issue_price = terms.issue_reference_price * (Decimal::ONE - terms.issuance_discount);
    let (new_shares, issuance_discount_cost) = if issue_price > Decimal::ZERO {
        let shares = new_equity / issue_price;
        (shares, shares * (terms.issue_reference_price - issue_price))
    } else {
        // No value to issue against; the whole equity half is lost to the discount.
        (Decimal::ZERO, new_equity)
    };

    Ok(FinancingImpact {
        financing_gap,
        new_debt,
        new_equity,
        pro_forma_debt,
        pro_forma_leverage,
        incremental_interest,
        pv_after_tax_interest,
        wacc_penalty,
        issue_price,
        new_shares,
        issuance_discount_cost,
        adjustment: pv_after_tax_interest + issuance_discount_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::financials::StatementLines;

    fn table(fcf: &[Money]) -> Vec<ConsolidatedYear> {
        fcf.iter()
            .enumerate()
            .map(|(i, f)| ConsolidatedYear {
                year: 2025 + i as i32,
                ebitda_margin: dec!(0.1),
                lines: StatementLines {
                    ebitda: dec!(2000),
                    fcf: *f,
                    ..Default::default()
                },
            })
            .collect()
    }

    fn terms() -> FinancingTerms {
        FinancingTerms {
            existing_debt: dec!(4100),
            cost_of_debt: dec!(0.07),
            tax_rate: dec!(0.21),
            issuance_discount: dec!(0.10),
            issue_reference_price: dec!(40),
            wacc: dec!(0.10),
        }
    }

    #[test]
    fn test_leverage_tiers() {
        assert_eq!(leverage_penalty(dec!(1.5)), Decimal::ZERO);
        assert_eq!(leverage_penalty(dec!(2.0)), Decimal::ZERO);
        assert_eq!(leverage_penalty(dec!(2.5)), dec!(0.0025));
        assert_eq!(leverage_penalty(dec!(4.0)), dec!(0.0050));
        assert_eq!(leverage_penalty(dec!(4.01)), dec!(0.0100));
    }

    #[test]
    fn test_no_gap_no_impact() {
        let impact = financing_impact(&table(&[dec!(100), dec!(200)]), &terms()).unwrap();
        assert!(impact.is_zero());
        assert_eq!(impact, FinancingImpact::none());
    }

    #[test]
    fn test_gap_split_and_dilution() {
        let impact =
            financing_impact(&table(&[dec!(-600), dec!(300), dec!(-400)]), &terms()).unwrap();
        assert_eq!(impact.financing_gap, dec!(1000));
        assert_eq!(impact.new_debt, dec!(500));
        assert_eq!(impact.new_equity, dec!(500));
        assert_eq!(impact.incremental_interest, dec!(35));
        assert_eq!(impact.issue_price, dec!(36));
        // 4600 / 2000
        assert_eq!(impact.pro_forma_leverage, dec!(2.3));
        assert_eq!(impact.wacc_penalty, dec!(0.0025));
        assert_eq!(impact.new_shares, dec!(500) / dec!(36));
        assert!(impact.adjustment > impact.pv_after_tax_interest);
        assert!(impact.adjustment > Decimal::ZERO);
    }

    #[test]
    fn test_zero_issue_price_does_not_divide() {
        let t = FinancingTerms { issue_reference_price: Decimal::ZERO, ..terms() };
        let impact = financing_impact(&table(&[dec!(-100)]), &t).unwrap();
        assert_eq!(impact.new_shares, Decimal::ZERO);
        assert_eq!(impact.issuance_discount_cost, dec!(50));
    }
}
