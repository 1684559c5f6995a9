pub mod csv_out;
pub mod minimal;
pub mod report;
pub mod table;

use rust_decimal::Decimal;
use serde::Serialize;

use steel_dcf_core::model::AnalysisOutput;
use steel_dcf_core::monte_carlo::McOutput;
use steel_dcf_core::projection::capital_projects::ProjectEconomics;
use steel_dcf_core::scenarios::{SensitivityOutput, WeightedValuation};
use steel_dcf_core::types::ComputationOutput;

use crate::commands::analysis::ScenarioRow;
use crate::commands::valuation::WaccReport;
use crate::OutputFormat;

/// Everything a command can hand to the formatters.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Analysis(ComputationOutput<AnalysisOutput>),
    Scenarios(ComputationOutput<Vec<ScenarioRow>>),
    Weighted(ComputationOutput<WeightedValuation>),
    Wacc(WaccReport),
    Projects(ComputationOutput<Vec<ProjectEconomics>>),
    Sensitivity(ComputationOutput<SensitivityOutput>),
    MonteCarlo(ComputationOutput<McOutput>),
}

/// One printable cell. Tables show the formatted form, CSV the raw number.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    /// $M or $/share, two decimals
    Money(Decimal),
    /// Decimal rate shown as a percentage
    Rate(Decimal),
    /// Tonnes, shares, multiples
    Quantity(Decimal),
    Float(f64),
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Money(v) => format!("{:.2}", v),
            Cell::Rate(v) => format!("{:.2}%", v * Decimal::ONE_HUNDRED),
            Cell::Quantity(v) => format!("{:.1}", v),
            Cell::Float(v) => format!("{:.2}", v),
            Cell::Empty => String::new(),
        }
    }

    pub fn raw(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Money(v) | Cell::Rate(v) | Cell::Quantity(v) => v.normalize().to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A titled block of rows with a fixed header.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Section {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Section {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

pub fn format_output(format: &OutputFormat, report: &Report) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(report),
        OutputFormat::Csv => csv_out::print_csv(report),
        OutputFormat::Minimal => minimal::print_minimal(report),
    }
}
