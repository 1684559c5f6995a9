use clap::Args;

use steel_dcf_core::scenarios::{wacc_sensitivity, ScenarioType, SensitivityInput, SweepAxis};
use steel_dcf_core::types::{Perspective, SensitivityVariable};

use super::{CliResult, ModelArgs};
use crate::output::Report;

/// Arguments for a WACC x terminal-driver share-price grid
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, value_enum, default_value = "acquirer")]
    pub perspective: Perspective,

    /// Second grid axis
    #[arg(long, value_enum, default_value = "terminal-growth")]
    pub axis: SweepAxis,

    /// Discount-rate sweep as min:max:step
    #[arg(long, default_value = "0.06:0.12:0.01")]
    pub wacc: String,

    /// Second-axis sweep as min:max:step (e.g. 0:0.02:0.005 or 3.5:6:0.5)
    #[arg(long)]
    pub second: Option<String>,
}

/// Variable name and default sweep for the second axis.
fn axis_defaults(axis: SweepAxis) -> (&'static str, &'static str) {
    match axis {
        SweepAxis::TerminalGrowth => ("terminal_growth", "0:0.02:0.005"),
        SweepAxis::ExitMultiple => ("exit_multiple", "3.5:6:0.5"),
    }
}

fn parse_range(
    name: &str,
    range: &str,
) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = range.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("{} must be min:max:step, got '{}'", name, range).into());
    }
    Ok(SensitivityVariable {
        name: name.to_string(),
        min: parts[0].parse()?,
        max: parts[1].parse()?,
        step: parts[2].parse()?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> CliResult {
    let model = args.model.model()?;
    let scenario = args.model.scenario(ScenarioType::BaseCase)?;

    let (name, default_range) = axis_defaults(args.axis);
    let input = SensitivityInput {
        perspective: args.perspective,
        wacc: parse_range("wacc", &args.wacc)?,
        axis: args.axis,
        second: parse_range(name, args.second.as_deref().unwrap_or(default_range))?,
    };

    Ok(Report::Sensitivity(wacc_sensitivity(&model, &scenario, &input)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: SensitivityArgs,
    }

    #[test]
    fn test_core_enums_parse_from_flags() {
        let h = Harness::try_parse_from([
            "steel-dcf",
            "--perspective",
            "standalone",
            "--axis",
            "exit-multiple",
        ])
        .unwrap();
        assert_eq!(h.args.perspective, Perspective::Standalone);
        assert_eq!(h.args.axis, SweepAxis::ExitMultiple);

        let defaults = Harness::try_parse_from(["steel-dcf"]).unwrap();
        assert_eq!(defaults.args.perspective, Perspective::Acquirer);
        assert_eq!(defaults.args.axis, SweepAxis::TerminalGrowth);
        assert!(Harness::try_parse_from(["steel-dcf", "--axis", "beta"]).is_err());
    }

    #[test]
    fn test_range_parsing() {
        let v = parse_range("wacc", "0.06:0.12:0.01").unwrap();
        assert_eq!(v.min.to_string(), "0.06");
        assert_eq!(v.step.to_string(), "0.01");
        assert!(parse_range("wacc", "0.06:0.12").is_err());
        assert!(parse_range("wacc", "a:b:c").is_err());
    }
}
