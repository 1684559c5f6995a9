use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::types::PricePerTon;
use crate::SteelDcfResult;

/// Public steel price indices that segment realized prices are quoted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Benchmark {
    /// US Midwest hot-rolled coil
    HrcUs,
    /// US cold-rolled coil
    CrcUs,
    /// US hot-dipped galvanized
    CoatedUs,
    /// Northern Europe hot-rolled coil
    HrcEu,
    /// Oil-country tubular goods
    Octg,
}

impl Benchmark {
    pub const ALL: [Benchmark; 5] = [
        Benchmark::HrcUs,
        Benchmark::CrcUs,
        Benchmark::CoatedUs,
        Benchmark::HrcEu,
        Benchmark::Octg,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Benchmark::HrcUs => "hrc_us",
            Benchmark::CrcUs => "crc_us",
            Benchmark::CoatedUs => "coated_us",
            Benchmark::HrcEu => "hrc_eu",
            Benchmark::Octg => "octg",
        }
    }
}

/// Base-year benchmark prices ($/t). Scenario factors multiply these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkPriceTable {
    pub prices: BTreeMap<Benchmark, PricePerTon>,
}

impl BenchmarkPriceTable {
    /// Through-cycle base-year prices used by the reference configuration.
    pub fn reference() -> Self {
        let prices = BTreeMap::from([
            (Benchmark::HrcUs, dec!(680)),
            (Benchmark::CrcUs, dec!(850)),
            (Benchmark::CoatedUs, dec!(950)),
            (Benchmark::HrcEu, dec!(620)),
            (Benchmark::Octg, dec!(2800)),
        ]);
        Self { prices }
    }

    pub fn price(&self, benchmark: Benchmark) -> SteelDcfResult<PricePerTon> {
        self.prices.get(&benchmark).copied().ok_or_else(|| {
            SteelDcfError::InsufficientData(format!(
                "no base price configured for benchmark '{}'",
                benchmark.key()
            ))
        })
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        for (benchmark, price) in &self.prices {
            if *price < Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    format!("benchmarks.{}", benchmark.key()),
                    "Base benchmark price cannot be negative",
                ));
            }
        }
        Ok(())
    }
}
