pub mod analysis;
pub mod monte_carlo;
pub mod sensitivity;
pub mod valuation;

use clap::Args;

use steel_dcf_core::model::{ModelConfig, ModelScenario, ValuationModel};
use steel_dcf_core::scenarios::{get_scenario_presets, ScenarioType};

use crate::input;
use crate::output::Report;

pub type CliResult = Result<Report, Box<dyn std::error::Error>>;

/// Where the model configuration and scenario come from.
#[derive(Args)]
pub struct ModelArgs {
    /// Preset scenario key (base_case, management_case, ...)
    #[arg(long)]
    pub scenario: Option<String>,

    /// JSON or YAML scenario file; takes precedence over --scenario
    #[arg(long)]
    pub input: Option<String>,

    /// JSON or YAML model configuration (defaults to the reference calibration)
    #[arg(long)]
    pub config: Option<String>,
}

impl ModelArgs {
    pub fn model(&self) -> Result<ValuationModel, Box<dyn std::error::Error>> {
        let config: ModelConfig = match &self.config {
            Some(path) => input::file::read_input(path)?,
            None => ModelConfig::reference(),
        };
        Ok(ValuationModel::new(config)?)
    }

    /// --input, then --scenario, then piped JSON, then `fallback`.
    pub fn scenario(
        &self,
        fallback: ScenarioType,
    ) -> Result<ModelScenario, Box<dyn std::error::Error>> {
        if let Some(path) = &self.input {
            return Ok(input::file::read_input(path)?);
        }
        if let Some(key) = &self.scenario {
            return preset(key);
        }
        if let Some(scenario) = input::stdin::read_stdin::<ModelScenario>()? {
            return Ok(scenario);
        }
        preset(fallback.key())
    }
}

pub fn preset(key: &str) -> Result<ModelScenario, Box<dyn std::error::Error>> {
    let mut presets = get_scenario_presets()?;
    let kind = presets
        .keys()
        .copied()
        .find(|k| k.key() == key)
        .ok_or_else(|| {
            let known: Vec<&str> = presets.keys().map(|k| k.key()).collect();
            format!("Unknown scenario '{}'; expected one of: {}", key, known.join(", "))
        })?;
    presets
        .remove(&kind)
        .ok_or_else(|| format!("Scenario '{key}' missing from presets").into())
}
