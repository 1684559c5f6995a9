use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::market::{BenchmarkPriceTable, SegmentTable};
use crate::projection::capital_projects::ProjectCatalog;
use crate::types::{Currency, Money, Rate};
use crate::valuation::dcf::EquityBridge;
use crate::valuation::wacc::WaccInputs;
use crate::SteelDcfResult;

/// Balance-sheet items and funding terms of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub bridge: EquityBridge,
    /// Diluted shares, millions
    pub shares_outstanding: Decimal,
    pub cash_tax_rate: Rate,
    /// Pre-tax rate on any new standalone borrowing
    pub cost_of_debt: Rate,
    /// Discount to market on new standalone equity
    pub issuance_discount: Rate,
    /// Offer on the table, for comparison in reports ($/share)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<Money>,
}

/// Everything a run reads but never changes.
///
/// Sensitivity and Monte Carlo work on modified clones, never on a shared
/// mutable instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub valuation_date: NaiveDate,
    pub horizon_years: u32,
    pub benchmarks: BenchmarkPriceTable,
    pub segments: SegmentTable,
    pub projects: ProjectCatalog,
    pub company: CompanyProfile,
}

impl ModelConfig {
    /// Reference calibration: a US integrated/mini-mill producer valued at
    /// year-end 2024 over a ten-year horizon.
    pub fn reference() -> Self {
        Self {
            valuation_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            horizon_years: 10,
            benchmarks: BenchmarkPriceTable::reference(),
            segments: SegmentTable::reference(),
            projects: ProjectCatalog::reference(),
            company: CompanyProfile {
                name: "Reference Steel Corp".into(),
                bridge: EquityBridge {
                    total_debt: dec!(4100),
                    pension_obligations: dec!(100),
                    operating_leases: dec!(250),
                    cash: dec!(2900),
                    equity_investments: dec!(700),
                },
                shares_outstanding: dec!(225),
                cash_tax_rate: dec!(0.21),
                cost_of_debt: dec!(0.0675),
                issuance_discount: dec!(0.10),
                offer_price: Some(dec!(55)),
            },
        }
    }

    /// Year of the valuation date; projection year 1 is the following year.
    pub fn base_year(&self) -> i32 {
        self.valuation_date.year()
    }

    pub fn projection_years(&self) -> Vec<i32> {
        let base = self.base_year();
        (1..=self.horizon_years as i32).map(|i| base + i).collect()
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        if self.horizon_years == 0 || self.horizon_years > 30 {
            return Err(SteelDcfError::invalid(
                "horizon_years",
                "Horizon must be between 1 and 30 years",
            ));
        }
        self.benchmarks.validate()?;
        self.segments.validate(&self.benchmarks)?;
        self.projects.validate()?;

        let c = &self.company;
        if c.shares_outstanding <= Decimal::ZERO {
            return Err(SteelDcfError::invalid(
                "company.shares_outstanding",
                "Shares outstanding must be positive",
            ));
        }
        for (field, rate) in [
            ("company.cash_tax_rate", c.cash_tax_rate),
            ("company.issuance_discount", c.issuance_discount),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(SteelDcfError::invalid(field, "Must be in [0, 1)"));
            }
        }
        if c.cost_of_debt < Decimal::ZERO {
            return Err(SteelDcfError::invalid("company.cost_of_debt", "Cannot be negative"));
        }
        let b = &c.bridge;
        for (field, amount) in [
            ("company.bridge.total_debt", b.total_debt),
            ("company.bridge.pension_obligations", b.pension_obligations),
            ("company.bridge.operating_leases", b.operating_leases),
            ("company.bridge.cash", b.cash),
            ("company.bridge.equity_investments", b.equity_investments),
        ] {
            if amount < Decimal::ZERO {
                return Err(SteelDcfError::invalid(field, "Bridge items cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Rate inputs for the reference deal: a yen-funded acquirer buying a US
/// target, with a domestic buyer at ~10.7%.
pub fn reference_wacc_inputs() -> WaccInputs {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config_validates() {
        let config = ModelConfig::reference();
        config.validate().unwrap();
        assert_eq!(config.base_year(), 2024);
        let years = config.projection_years();
        assert_eq!(years.first(), Some(&2025));
        assert_eq!(years.last(), Some(&2034));
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = ModelConfig::reference();
        let json = serde_json::to_string(&config).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_zero_shares_rejected() {
        let mut config = ModelConfig::reference();
        config.company.shares_outstanding = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
