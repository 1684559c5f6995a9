use clap::Args;
use serde::Serialize;

use steel_dcf_core::scenarios::{domestic_wacc_input, ScenarioType};
use steel_dcf_core::valuation::wacc::{
    calculate_wacc, cross_border_wacc, CrossBorderWacc, WaccOutput,
};

use super::{CliResult, ModelArgs};
use crate::output::Report;

#[derive(Args)]
pub struct WaccArgs {
    /// Preset scenario key
    #[arg(long)]
    pub scenario: Option<String>,

    /// JSON or YAML scenario file; takes precedence over --scenario
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WaccReport {
    /// CAPM build-up of the domestic buyer's rate
    pub domestic_build_up: WaccOutput,
    pub cross_border: CrossBorderWacc,
    pub warnings: Vec<String>,
}

pub fn run_wacc(args: WaccArgs) -> CliResult {
    let scenario = ModelArgs {
        scenario: args.scenario,
        input: args.input,
        config: None,
    }
    .scenario(ScenarioType::BaseCase)?;
    let domestic = calculate_wacc(&domestic_wacc_input())?;
    let mut warnings = domestic.warnings;
    let cross_border = cross_border_wacc(&scenario.wacc, scenario.wacc_override, &mut warnings)?;
    Ok(Report::Wacc(WaccReport {
        domestic_build_up: domestic.result,
        cross_border,
        warnings,
    }))
}
