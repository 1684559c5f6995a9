use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::error::SteelDcfError;
use crate::market::{BenchmarkPriceTable, Segment, SegmentTable};
use crate::model::scenario::{ModelScenario, SteelPriceScenario, VolumeScenario};
use crate::types::{Kilotons, PricePerTon, Rate};
use crate::SteelDcfResult;

/// Realized price and shipment paths for every segment under one scenario.
///
/// Holds only borrowed, read-only tables; building one is free.
#[derive(Debug, Clone, Copy)]
pub struct PriceVolumeEngine<'a> {
    benchmarks: &'a BenchmarkPriceTable,
    segments: &'a SegmentTable,
    prices: &'a SteelPriceScenario,
    volumes: &'a VolumeScenario,
    realization_overrides: &'a BTreeMap<Segment, Rate>,
    base_year: i32,
}

impl<'a> PriceVolumeEngine<'a> {
    pub fn new(
        benchmarks: &'a BenchmarkPriceTable,
        segments: &'a SegmentTable,
        scenario: &'a ModelScenario,
        base_year: i32,
    ) -> Self {
        Self {
            benchmarks,
            segments,
            prices: &scenario.prices,
            volumes: &scenario.volumes,
            realization_overrides: &scenario.realization_overrides,
            base_year,
        }
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    /// Multiplier between the benchmark and the segment's realized price.
    pub fn realization_multiplier(&self, segment: Segment) -> SteelDcfResult<Rate> {
        let premium = match self.realization_overrides.get(&segment) {
            Some(over) => *over,
            None => self.segments.get(segment)?.premium_to_benchmark,
        };
        Ok(Decimal::ONE + premium)
    }

    /// Realized price ($/t) for `segment` in `year`.
    pub fn price(&self, segment: Segment, year: i32) -> SteelDcfResult<PricePerTon> {
        let config = self.segments.get(segment)?;
        let benchmark = self.benchmarks.price(config.benchmark)?;
        let realized_base = benchmark
            * self.prices.factor(config.benchmark)
            * self.realization_multiplier(segment)?;
        let growth = compound(self.prices.annual_price_growth, self.periods(year)?)?;
        Ok(realized_base * growth)
    }

    /// Shipments (kt) for `segment` in `year`. Depends on that segment only.
    pub fn volume(&self, segment: Segment, year: i32) -> SteelDcfResult<Kilotons> {
        let config = self.segments.get(segment)?;
        let base = config.capacity_kt * self.volumes.factor(segment) * config.capacity_utilization;
        let growth = compound(self.volumes.growth(segment), self.periods(year)?)?;
        Ok(base * growth)
    }

    fn periods(&self, year: i32) -> SteelDcfResult<i64> {
        if year < self.base_year {
            return Err(SteelDcfError::invalid(
                "year",
                format!("{year} precedes the base year {}", self.base_year),
            ));
        }
        Ok(i64::from(year - self.base_year))
    }
}

/// (1 + rate)^periods
fn compound(rate: Rate, periods: i64) -> SteelDcfResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(periods)
        .ok_or_else(|| {
            SteelDcfError::invalid("growth", format!("(1 + {rate})^{periods} overflows"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Benchmark;
    use crate::model::config::{reference_wacc_inputs, ModelConfig};
    use rust_decimal_macros::dec;

    fn scenario() -> ModelScenario {
        ModelScenario::builder("test", reference_wacc_inputs()).build().unwrap()
    }

    #[test]
    fn test_base_year_price_equals_configured_base_price() {
        let config = ModelConfig::reference();
        let s = scenario();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        for segment in Segment::ALL {
            assert_eq!(
                engine.price(segment, 2024).unwrap(),
                config.segments.get(segment).unwrap().base_price
            );
        }
    }

    #[test]
    fn test_price_growth_compounds() {
        let config = ModelConfig::reference();
        let s = ModelScenario::builder("g", reference_wacc_inputs())
            .price_growth(dec!(0.02))
            .build()
            .unwrap();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        let p = engine.price(Segment::MiniMill, 2026).unwrap();
        assert_eq!(p, dec!(714) * dec!(1.02) * dec!(1.02));
    }

    #[test]
    fn test_realization_override_replaces_premium_for_one_segment() {
        let config = ModelConfig::reference();
        let s = ModelScenario::builder("r", reference_wacc_inputs())
            .realization_override(Segment::FlatRolled, dec!(0.30))
            .price_growth(dec!(0.01))
            .build()
            .unwrap();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        // 680 * 1.30, then growth on the realized price
        assert_eq!(engine.price(Segment::FlatRolled, 2025).unwrap(), dec!(884) * dec!(1.01));
        // mini mill still uses its configured 5% premium on the same benchmark
        assert_eq!(engine.price(Segment::MiniMill, 2025).unwrap(), dec!(714) * dec!(1.01));
    }

    #[test]
    fn test_volume_is_segment_local() {
        let config = ModelConfig::reference();
        let s = ModelScenario::builder("v", reference_wacc_inputs())
            .volume_factor(Segment::Europe, dec!(0.5))
            .volume_growth(Segment::Europe, dec!(0.10))
            .build()
            .unwrap();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        assert_eq!(engine.volume(Segment::Europe, 2025).unwrap(), dec!(1800) * dec!(1.10));
        assert_eq!(engine.volume(Segment::Tubular, 2025).unwrap(), dec!(495));
    }

    #[test]
    fn test_zero_and_negative_factors_do_not_fail() {
        let config = ModelConfig::reference();
        let s = ModelScenario::builder("crash", reference_wacc_inputs())
            .price_factor(Benchmark::HrcUs, Decimal::ZERO)
            .price_factor(Benchmark::Octg, dec!(-0.1))
            .build()
            .unwrap();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        assert_eq!(engine.price(Segment::FlatRolled, 2030).unwrap(), Decimal::ZERO);
        assert!(engine.price(Segment::Tubular, 2030).unwrap() < Decimal::ZERO);
    }

    #[test]
    fn test_year_before_base_rejected() {
        let config = ModelConfig::reference();
        let s = scenario();
        let engine = PriceVolumeEngine::new(&config.benchmarks, &config.segments, &s, 2024);
        assert!(engine.price(Segment::Europe, 2020).is_err());
    }
}
