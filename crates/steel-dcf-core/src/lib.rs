pub mod error;
pub mod market;
pub mod model;
pub mod projection;
pub mod time_value;
pub mod types;
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

pub use error::SteelDcfError;
pub use model::{ModelConfig, ModelScenario, ValuationModel};
pub use types::*;

/// Standard result type for all steel-dcf operations
pub type SteelDcfResult<T> = Result<T, SteelDcfError>;
