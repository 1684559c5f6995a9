use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SteelDcfError;
use crate::SteelDcfResult;

/// All monetary values, in $ millions unless a field says otherwise.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 4.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Steel prices in $ per metric ton.
pub type PricePerTon = Decimal;

/// Shipments and capacity in thousand metric tons.
pub type Kilotons = Decimal;

/// Currency code
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    USD,
    JPY,
    EUR,
    Other(String),
}

/// Which acquirer's cost of capital drives a valuation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    /// The target valued on its own by a domestic buyer, no synergies.
    Standalone,
    /// The foreign acquirer, discounting at its IRP-converted WACC.
    Acquirer,
}

/// Sensitivity variable specification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    with_precision(methodology, assumptions, warnings, elapsed_us, "rust_decimal_128bit", result)
}

/// Same envelope for computations carried out in `f64` (sampling, statistics).
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    with_precision(methodology, assumptions, warnings, elapsed_us, "ieee754_f64", result)
}

fn with_precision<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.to_string(),
        },
    }
}

/// Convert a sampled `f64` into a `Decimal`, rejecting NaN and infinities.
pub fn decimal_from_f64(value: f64, field: &str) -> SteelDcfResult<Decimal> {
    if !value.is_finite() {
        return Err(SteelDcfError::invalid(field, format!("non-finite value {value}")));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| SteelDcfError::invalid(field, format!("{value} is out of decimal range")))
}

/// Lossy conversion used when handing results to the sampling layer.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
