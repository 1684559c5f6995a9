mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::{AnalyzeArgs, ProjectsArgs, ScenariosArgs, WeightedArgs};
use commands::monte_carlo::MonteCarloArgs;
use commands::sensitivity::SensitivityArgs;
use commands::valuation::WaccArgs;

/// Steel acquisition DCF model
#[derive(Parser)]
#[command(
    name = "steel-dcf",
    version,
    about = "Price x volume DCF valuation of a steel acquisition",
    long_about = "Projects segment financials from steel price and volume scenarios and \
                  values the target from a standalone buyer's and a cross-border \
                  acquirer's perspective, with scenario weighting, WACC sensitivity \
                  grids and correlated Monte Carlo sampling."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. debug, steel_dcf_core=trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario through projection, consolidation and both valuations
    Analyze(AnalyzeArgs),
    /// Summarize every preset scenario
    Scenarios(ScenariosArgs),
    /// Probability-weighted share prices across scenarios
    Weighted(WeightedArgs),
    /// Domestic CAPM build-up and IRP-converted acquirer WACC
    Wacc(WaccArgs),
    /// Stand-alone NPV / IRR of each capital project
    Projects(ProjectsArgs),
    /// WACC x terminal growth (or exit multiple) share-price grid
    Sensitivity(SensitivityArgs),
    /// Correlated Latin-hypercube Monte Carlo over the full model
    MonteCarlo(MonteCarloArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result: commands::CliResult = match cli.command {
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Scenarios(args) => commands::analysis::run_scenarios(args),
        Commands::Weighted(args) => commands::analysis::run_weighted(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Projects(args) => commands::analysis::run_projects(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Version => {
            println!("steel-dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(report) => {
            output::format_output(&cli.output, &report);
            process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
