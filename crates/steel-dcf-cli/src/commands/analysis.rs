use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use steel_dcf_core::scenarios::{
    calculate_probability_weighted_valuation, default_scenario_weights, get_scenario_presets,
    ScenarioType,
};
use steel_dcf_core::types::{with_metadata, Money, Rate};

use super::{CliResult, ModelArgs};
use crate::input;
use crate::output::Report;

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Args)]
pub struct ScenariosArgs {
    /// JSON or YAML model configuration
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Args)]
pub struct WeightedArgs {
    /// JSON or YAML map of scenario key to probability (defaults to the
    /// five-scenario cycle weights)
    #[arg(long)]
    pub weights: Option<String>,

    /// JSON or YAML model configuration
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Args)]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

/// One line of the preset comparison.
#[derive(Debug, Serialize)]
pub struct ScenarioRow {
    pub scenario: ScenarioType,
    pub name: String,
    pub standalone_share_price: Money,
    pub acquirer_share_price: Money,
    pub acquirer_premium: Money,
    pub acquirer_wacc: Rate,
    pub financing_gap: Money,
    pub synergy_npv: Money,
}

pub fn run_analyze(args: AnalyzeArgs) -> CliResult {
    let model = args.model.model()?;
    let scenario = args.model.scenario(ScenarioType::BaseCase)?;
    Ok(Report::Analysis(model.run_full_analysis(&scenario)?))
}

pub fn run_scenarios(args: ScenariosArgs) -> CliResult {
    let start = Instant::now();
    let model = ModelArgs {
        scenario: None,
        input: None,
        config: args.config,
    }
    .model()?;

    let mut warnings = Vec::new();
    let mut rows = Vec::new();
    for (kind, scenario) in get_scenario_presets()? {
        let mut run_warnings = Vec::new();
        let out = model.analyze(&scenario, &mut run_warnings)?;
        warnings.extend(run_warnings.into_iter().map(|w| format!("[{kind}] {w}")));
        rows.push(ScenarioRow {
            scenario: kind,
            name: scenario.name,
            standalone_share_price: out.standalone.share_price.round_dp(2),
            acquirer_share_price: out.acquirer.share_price.round_dp(2),
            acquirer_premium: out.acquirer_premium.round_dp(2),
            acquirer_wacc: out.wacc.wacc_used.round_dp(4),
            financing_gap: out.financing.financing_gap.round_dp(1),
            synergy_npv: out.acquirer.synergy_npv.round_dp(1),
        });
    }

    let result = with_metadata(
        "Every preset scenario through the full chain",
        &serde_json::json!({ "scenarios": rows.len() }),
        warnings,
        start.elapsed().as_micros() as u64,
        rows,
    );
    Ok(Report::Scenarios(result))
}

pub fn run_weighted(args: WeightedArgs) -> CliResult {
    let model = ModelArgs {
        scenario: None,
        input: None,
        config: args.config,
    }
    .model()?;
    let weights: BTreeMap<ScenarioType, Decimal> = match &args.weights {
        Some(path) => input::file::read_input(path)?,
        None => default_scenario_weights(),
    };
    let presets = get_scenario_presets()?;
    let result = calculate_probability_weighted_valuation(&model, &presets, &weights)?;
    Ok(Report::Weighted(result))
}

pub fn run_projects(args: ProjectsArgs) -> CliResult {
    let model = args.model.model()?;
    let scenario = args.model.scenario(ScenarioType::BaseCase)?;
    Ok(Report::Projects(model.project_economics(&scenario)?))
}
