pub mod analysis;
pub mod config;
pub mod scenario;

pub use analysis::{AnalysisOutput, ValuationModel};
pub use config::{reference_wacc_inputs, CompanyProfile, ModelConfig};
pub use scenario::{ModelScenario, ModelScenarioBuilder, SteelPriceScenario, VolumeScenario};
