use clap::Args;

use steel_dcf_core::monte_carlo::{run_simulation, McConfig};
use steel_dcf_core::scenarios::ScenarioType;

use super::{CliResult, ModelArgs};
use crate::input;
use crate::output::Report;

/// Arguments for the correlated Monte Carlo run
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of draws
    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// JSON or YAML sampling configuration (defaults to the 30-variable set)
    #[arg(long)]
    pub mc_config: Option<String>,

    /// Keep every per-sample row in the output
    #[arg(long)]
    pub include_samples: bool,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> CliResult {
    let model = args.model.model()?;
    let scenario = args.model.scenario(ScenarioType::ManagementCase)?;
    let config: McConfig = match &args.mc_config {
        Some(path) => input::file::read_input(path)?,
        None => McConfig::reference(),
    };

    let mut result = run_simulation(&model, &scenario, &config, args.samples, args.seed)?;
    if !args.include_samples {
        result.result.samples.clear();
    }
    Ok(Report::MonteCarlo(result))
}
