use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::benchmarks::{Benchmark, BenchmarkPriceTable};
use crate::error::SteelDcfError;
use crate::types::{Kilotons, PricePerTon, Rate};
use crate::SteelDcfResult;

/// Reporting segments of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Integrated blast-furnace flat products
    FlatRolled,
    /// Electric-arc-furnace mini mill
    MiniMill,
    /// European integrated operations
    Europe,
    /// Seamless and welded tubular products
    Tubular,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::FlatRolled,
        Segment::MiniMill,
        Segment::Europe,
        Segment::Tubular,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Segment::FlatRolled => "flat_rolled",
            Segment::MiniMill => "mini_mill",
            Segment::Europe => "europe",
            Segment::Tubular => "tubular",
        }
    }
}

/// Operating economics of one segment in the base year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Index the segment's realized price is quoted against
    pub benchmark: Benchmark,
    /// Shipment capacity in the base year (kt)
    pub capacity_kt: Kilotons,
    /// Share of capacity actually shipped
    pub capacity_utilization: Rate,
    /// Realized price in the base year ($/t); the margin model's reference point
    pub base_price: PricePerTon,
    /// EBITDA margin when the realized price equals `base_price`
    pub base_ebitda_margin: Rate,
    /// Margin change (as a fraction) per $100/t move away from `base_price`
    pub margin_sensitivity: Rate,
    /// Premium of the realized price over the benchmark (0.05 = 5% above)
    pub premium_to_benchmark: Rate,
    pub da_pct_revenue: Rate,
    pub maintenance_capex_pct_revenue: Rate,
    /// Days sales outstanding
    pub dso: Decimal,
    /// Days inventory held
    pub dih: Decimal,
    /// Days payables outstanding
    pub dpo: Decimal,
}

impl SegmentConfig {
    /// Shipments in the base year before any scenario adjustment.
    pub fn base_shipments(&self) -> Kilotons {
        self.capacity_kt * self.capacity_utilization
    }

    fn validate(&self, segment: Segment, benchmarks: &BenchmarkPriceTable) -> SteelDcfResult<()> {
        let field = |name: &str| format!("segments.{}.{name}", segment.key());
        benchmarks.price(self.benchmark)?;
        if self.capacity_kt < Decimal::ZERO {
            return Err(SteelDcfError::invalid(field("capacity_kt"), "Capacity cannot be negative"));
        }
        if self.capacity_utilization < Decimal::ZERO || self.capacity_utilization > dec!(1.2) {
            return Err(SteelDcfError::invalid(
                field("capacity_utilization"),
                "Utilization must be between 0 and 1.2",
            ));
        }
        if self.premium_to_benchmark <= dec!(-1) {
            return Err(SteelDcfError::invalid(
                field("premium_to_benchmark"),
                "Premium must be greater than -100%",
            ));
        }
        for (name, pct) in [
            ("da_pct_revenue", self.da_pct_revenue),
            ("maintenance_capex_pct_revenue", self.maintenance_capex_pct_revenue),
        ] {
            if pct < Decimal::ZERO || pct > Decimal::ONE {
                return Err(SteelDcfError::invalid(field(name), "Must be between 0 and 1"));
            }
        }
        for (name, days) in [("dso", self.dso), ("dih", self.dih), ("dpo", self.dpo)] {
            if days < Decimal::ZERO {
                return Err(SteelDcfError::invalid(field(name), "Day counts cannot be negative"));
            }
        }
        Ok(())
    }
}

/// Immutable lookup from segment to its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    pub segments: BTreeMap<Segment, SegmentConfig>,
}

impl SegmentTable {
    /// Base-year economics of the reference target.
    ///
    /// Flat-Rolled carries the blast-furnace maintenance burden (6% of revenue)
    /// against 3% at the mini mill.
    pub fn reference() -> Self {
        let segments = BTreeMap::from([
            (
                Segment::FlatRolled,
                SegmentConfig {
                    benchmark: Benchmark::HrcUs,
                    capacity_kt: dec!(10000),
                    capacity_utilization: dec!(0.87),
                    base_price: dec!(1020),
                    base_ebitda_margin: dec!(0.13),
                    margin_sensitivity: dec!(0.020),
                    premium_to_benchmark: dec!(0.50),
                    da_pct_revenue: dec!(0.045),
                    maintenance_capex_pct_revenue: dec!(0.060),
                    dso: dec!(30),
                    dih: dec!(55),
                    dpo: dec!(45),
                },
            ),
            (
                Segment::MiniMill,
                SegmentConfig {
                    benchmark: Benchmark::HrcUs,
                    capacity_kt: dec!(3300),
                    capacity_utilization: dec!(0.85),
                    base_price: dec!(714),
                    base_ebitda_margin: dec!(0.17),
                    margin_sensitivity: dec!(0.025),
                    premium_to_benchmark: dec!(0.05),
                    da_pct_revenue: dec!(0.050),
                    maintenance_capex_pct_revenue: dec!(0.030),
                    dso: dec!(28),
                    dih: dec!(40),
                    dpo: dec!(40),
                },
            ),
            (
                Segment::Europe,
                SegmentConfig {
                    benchmark: Benchmark::HrcEu,
                    capacity_kt: dec!(4500),
                    capacity_utilization: dec!(0.80),
                    base_price: dec!(713),
                    base_ebitda_margin: dec!(0.08),
                    margin_sensitivity: dec!(0.020),
                    premium_to_benchmark: dec!(0.15),
                    da_pct_revenue: dec!(0.035),
                    maintenance_capex_pct_revenue: dec!(0.045),
                    dso: dec!(45),
                    dih: dec!(60),
                    dpo: dec!(50),
                },
            ),
            (
                Segment::Tubular,
                SegmentConfig {
                    benchmark: Benchmark::Octg,
                    capacity_kt: dec!(900),
                    capacity_utilization: dec!(0.55),
                    base_price: dec!(2660),
                    base_ebitda_margin: dec!(0.15),
                    margin_sensitivity: dec!(0.005),
                    premium_to_benchmark: dec!(-0.05),
                    da_pct_revenue: dec!(0.040),
                    maintenance_capex_pct_revenue: dec!(0.030),
                    dso: dec!(50),
                    dih: dec!(90),
                    dpo: dec!(40),
                },
            ),
        ]);
        Self { segments }
    }

    pub fn get(&self, segment: Segment) -> SteelDcfResult<&SegmentConfig> {
        self.segments.get(&segment).ok_or_else(|| {
            SteelDcfError::InsufficientData(format!(
                "no configuration for segment '{}'",
                segment.key()
            ))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Segment, &SegmentConfig)> {
        self.segments.iter()
    }

    pub fn validate(&self, benchmarks: &BenchmarkPriceTable) -> SteelDcfResult<()> {
        if self.segments.is_empty() {
            return Err(SteelDcfError::InsufficientData(
                "at least one segment must be configured".into(),
            ));
        }
        for (segment, config) in &self.segments {
            config.validate(*segment, benchmarks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_validates() {
        let table = SegmentTable::reference();
        table.validate(&BenchmarkPriceTable::reference()).unwrap();
        assert_eq!(table.segments.len(), Segment::ALL.len());
    }

    #[test]
    fn test_reference_base_price_matches_benchmark_premium() {
        let benchmarks = BenchmarkPriceTable::reference();
        for (_, cfg) in SegmentTable::reference().iter() {
            let implied = benchmarks.price(cfg.benchmark).unwrap()
                * (Decimal::ONE + cfg.premium_to_benchmark);
            assert_eq!(implied, cfg.base_price);
        }
    }

    #[test]
    fn test_integrated_maintenance_exceeds_mini_mill() {
        let table = SegmentTable::reference();
        let flat = table.get(Segment::FlatRolled).unwrap();
        let mini = table.get(Segment::MiniMill).unwrap();
        assert!(flat.maintenance_capex_pct_revenue > mini.maintenance_capex_pct_revenue);
    }

    #[test]
    fn test_negative_day_count_rejected() {
        let mut table = SegmentTable::reference();
        table.segments.get_mut(&Segment::Europe).unwrap().dpo = dec!(-1);
        assert!(table.validate(&BenchmarkPriceTable::reference()).is_err());
    }
}
