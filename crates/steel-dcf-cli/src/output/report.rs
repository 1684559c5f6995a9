use rust_decimal::Decimal;

use steel_dcf_core::model::AnalysisOutput;
use steel_dcf_core::monte_carlo::{McOutput, McOutputStatistics};
use steel_dcf_core::projection::capital_projects::ProjectEconomics;
use steel_dcf_core::projection::{ConsolidatedYear, SegmentProjection};
use steel_dcf_core::scenarios::{SensitivityOutput, WeightedValuation};
use steel_dcf_core::valuation::ValuationResult;

use super::{Cell, Report, Section};
use crate::commands::analysis::ScenarioRow;
use crate::commands::valuation::WaccReport;

impl Report {
    /// Tabular view of the report, one section per logical block.
    pub fn sections(&self) -> Vec<Section> {
        match self {
            Report::Analysis(out) => analysis_sections(&out.result),
            Report::Scenarios(out) => vec![scenario_section(&out.result)],
            Report::Weighted(out) => vec![weighted_section(&out.result)],
            Report::Wacc(report) => vec![wacc_section(report)],
            Report::Projects(out) => vec![project_section(&out.result)],
            Report::Sensitivity(out) => vec![sensitivity_section(&out.result)],
            Report::MonteCarlo(out) => monte_carlo_sections(&out.result),
        }
    }

    /// The answer in as few lines as possible.
    pub fn headline(&self) -> Vec<String> {
        match self {
            Report::Analysis(out) => vec![format!(
                "standalone {:.2} acquirer {:.2}",
                out.result.standalone.share_price, out.result.acquirer.share_price
            )],
            Report::Scenarios(out) => out
                .result
                .iter()
                .map(|r| {
                    format!(
                        "{} {:.2} {:.2}",
                        r.scenario, r.standalone_share_price, r.acquirer_share_price
                    )
                })
                .collect(),
            Report::Weighted(out) => vec![format!(
                "standalone {:.2} acquirer {:.2}",
                out.result.expected_standalone_share_price,
                out.result.expected_acquirer_share_price
            )],
            Report::Wacc(report) => vec![report.cross_border.wacc_used.to_string()],
            Report::Projects(out) => out
                .result
                .iter()
                .map(|p| format!("{} {:.1}", p.name, p.npv))
                .collect(),
            Report::Sensitivity(out) => vec![format!("{:.2}", out.result.base_case_value)],
            Report::MonteCarlo(out) => vec![format!(
                "p50 standalone {:.2} acquirer {:.2}",
                out.result.summary.standalone_share_price.median,
                out.result.summary.acquirer_share_price.median
            )],
        }
    }

    /// Warnings and methodology carried by the envelope.
    pub fn notes(&self) -> (&[String], Option<&str>) {
        let (warnings, methodology) = match self {
            Report::Analysis(out) => (&out.warnings, &out.methodology),
            Report::Scenarios(out) => (&out.warnings, &out.methodology),
            Report::Weighted(out) => (&out.warnings, &out.methodology),
            Report::Wacc(report) => return (report.warnings.as_slice(), None),
            Report::Projects(out) => (&out.warnings, &out.methodology),
            Report::Sensitivity(out) => (&out.warnings, &out.methodology),
            Report::MonteCarlo(out) => (&out.warnings, &out.methodology),
        };
        (warnings.as_slice(), Some(methodology.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Single-scenario analysis
// ---------------------------------------------------------------------------

fn analysis_sections(out: &AnalysisOutput) -> Vec<Section> {
    let mut sections = vec![
        valuation_section(&out.standalone, &out.acquirer),
        summary_section(out),
        consolidated_section(&out.consolidated),
    ];
    sections.extend(out.segments.values().map(segment_section));
    sections
}

/// Standalone and acquirer side by side, EV down to share price.
pub fn valuation_section(standalone: &ValuationResult, acquirer: &ValuationResult) -> Section {
    let mut section = Section::new("valuation", &["line", "standalone", "acquirer"]);
    let lines: [(&str, fn(&ValuationResult) -> Cell); 17] = [
        ("wacc", |v| Cell::Rate(v.wacc)),
        ("terminal_growth", |v| Cell::Rate(v.terminal_growth)),
        ("exit_multiple", |v| Cell::Quantity(v.exit_multiple)),
        ("pv_fcf", |v| Cell::Money(v.pv_fcf)),
        ("pv_terminal_value_gordon", |v| Cell::Money(v.pv_terminal_value_gordon)),
        ("pv_terminal_value_exit", |v| Cell::Money(v.pv_terminal_value_exit)),
        ("enterprise_value", |v| Cell::Money(v.enterprise_value)),
        ("synergy_npv", |v| Cell::Money(v.synergy_npv)),
        ("total_debt", |v| Cell::Money(-v.total_debt)),
        ("pension_obligations", |v| Cell::Money(-v.pension_obligations)),
        ("operating_leases", |v| Cell::Money(-v.operating_leases)),
        ("cash", |v| Cell::Money(v.cash)),
        ("equity_investments", |v| Cell::Money(v.equity_investments)),
        ("financing_adjustment", |v| Cell::Money(-v.financing_adjustment)),
        ("equity_value", |v| Cell::Money(v.equity_value)),
        ("shares_outstanding", |v| Cell::Quantity(v.shares_outstanding)),
        ("share_price", |v| Cell::Money(v.share_price)),
    ];
    for (label, cell) in lines {
        section.push(vec![Cell::text(label), cell(standalone), cell(acquirer)]);
    }
    section.push(vec![
        Cell::text("terminal_value_share"),
        Cell::Rate(standalone.terminal_value_share),
        Cell::Rate(acquirer.terminal_value_share),
    ]);
    section
}

fn summary_section(out: &AnalysisOutput) -> Section {
    let mut section = Section::new("summary", &["item", "value"]);
    section.push(vec![Cell::text("scenario"), Cell::text(out.scenario.as_str())]);
    section.push(vec![Cell::text("projects"), Cell::text(out.projects.join(" "))]);
    section.push(vec![Cell::text("acquirer_premium"), Cell::Money(out.acquirer_premium)]);
    section.push(vec![
        Cell::text("offer_price"),
        out.offer_price.map_or(Cell::Empty, Cell::Money),
    ]);
    section.push(vec![Cell::text("irp_wacc"), Cell::Rate(out.wacc.irp_wacc)]);
    section.push(vec![Cell::text("wacc_advantage"), Cell::Rate(out.wacc.wacc_advantage)]);
    section.push(vec![
        Cell::text("financing_gap"),
        Cell::Money(out.financing.financing_gap),
    ]);
    section.push(vec![
        Cell::text("new_shares"),
        Cell::Quantity(out.financing.new_shares),
    ]);
    section.push(vec![
        Cell::text("aggregation_max_difference"),
        Cell::Money(out.aggregation.max_abs_difference),
    ]);
    section
}

/// Per-year consolidated lines.
pub fn consolidated_section(rows: &[ConsolidatedYear]) -> Section {
    let mut section = Section::new(
        "consolidated",
        &[
            "year",
            "shipments_kt",
            "revenue",
            "ebitda",
            "ebitda_margin",
            "total_capex",
            "delta_wc",
            "fcf",
        ],
    );
    for row in rows {
        let l = &row.lines;
        section.push(vec![
            Cell::text(row.year.to_string()),
            Cell::Quantity(l.shipments_kt),
            Cell::Money(l.revenue),
            Cell::Money(l.ebitda),
            Cell::Rate(row.ebitda_margin),
            Cell::Money(l.total_capex),
            Cell::Money(l.delta_working_capital),
            Cell::Money(l.fcf),
        ]);
    }
    section
}

fn segment_section(projection: &SegmentProjection) -> Section {
    let mut section = Section::new(
        format!("segment:{}", projection.segment.key()),
        &[
            "year",
            "price_per_t",
            "shipments_kt",
            "revenue",
            "ebitda",
            "ebitda_margin",
            "fcf",
        ],
    );
    for row in &projection.rows {
        let l = &row.lines;
        section.push(vec![
            Cell::text(row.year.to_string()),
            Cell::Money(row.realized_price),
            Cell::Quantity(l.shipments_kt),
            Cell::Money(l.revenue),
            Cell::Money(l.ebitda),
            Cell::Rate(row.ebitda_margin),
            Cell::Money(l.fcf),
        ]);
    }
    section
}

// ---------------------------------------------------------------------------
// Multi-scenario views
// ---------------------------------------------------------------------------

fn scenario_section(rows: &[ScenarioRow]) -> Section {
    let mut section = Section::new(
        "scenarios",
        &[
            "scenario",
            "standalone",
            "acquirer",
            "premium",
            "acquirer_wacc",
            "financing_gap",
            "synergy_npv",
        ],
    );
    for r in rows {
        section.push(vec![
            Cell::text(r.scenario.key()),
            Cell::Money(r.standalone_share_price),
            Cell::Money(r.acquirer_share_price),
            Cell::Money(r.acquirer_premium),
            Cell::Rate(r.acquirer_wacc),
            Cell::Money(r.financing_gap),
            Cell::Money(r.synergy_npv),
        ]);
    }
    section
}

fn weighted_section(weighted: &WeightedValuation) -> Section {
    let mut section = Section::new(
        "weighted",
        &["scenario", "probability", "standalone", "acquirer", "deviation"],
    );
    for r in &weighted.results {
        section.push(vec![
            Cell::text(r.scenario.key()),
            Cell::Rate(r.probability),
            Cell::Money(r.standalone_share_price),
            Cell::Money(r.acquirer_share_price),
            Cell::Money(r.standalone_deviation),
        ]);
    }
    section.push(vec![
        Cell::text("expected"),
        Cell::Rate(Decimal::ONE),
        Cell::Money(weighted.expected_standalone_share_price),
        Cell::Money(weighted.expected_acquirer_share_price),
        Cell::Empty,
    ]);
    section
}

fn wacc_section(report: &WaccReport) -> Section {
    let d = &report.domestic_build_up;
    let x = &report.cross_border;
    let mut section = Section::new("wacc", &["component", "rate"]);
    let rows = [
        ("domestic_cost_of_equity", Some(d.cost_of_equity)),
        ("domestic_after_tax_cost_of_debt", Some(d.after_tax_cost_of_debt)),
        ("domestic_build_up_wacc", Some(d.wacc)),
        ("home_cost_of_equity", Some(x.home_cost_of_equity)),
        ("home_after_tax_cost_of_debt", Some(x.home_after_tax_cost_of_debt)),
        ("home_wacc", Some(x.home_wacc)),
        ("irp_wacc", Some(x.irp_wacc)),
        ("override_wacc", x.override_wacc),
        ("acquirer_wacc_used", Some(x.wacc_used)),
        ("scenario_domestic_wacc", Some(x.domestic_wacc)),
        ("wacc_advantage", Some(x.wacc_advantage)),
    ];
    for (label, rate) in rows {
        section.push(vec![Cell::text(label), rate.map_or(Cell::Empty, Cell::Rate)]);
    }
    section
}

fn project_section(projects: &[ProjectEconomics]) -> Section {
    let mut section = Section::new(
        "projects",
        &[
            "project",
            "segment",
            "committed",
            "total_capex",
            "terminal_ebitda",
            "npv",
            "irr",
            "payback_year",
        ],
    );
    for p in projects {
        section.push(vec![
            Cell::text(p.name.as_str()),
            Cell::text(p.segment.key()),
            Cell::text(p.committed.to_string()),
            Cell::Money(p.total_capex),
            Cell::Money(p.terminal_year_ebitda),
            Cell::Money(p.npv),
            p.irr.map_or(Cell::Empty, Cell::Rate),
            p.payback_year
                .map_or(Cell::Empty, |y| Cell::text(y.to_string())),
        ]);
    }
    section
}

/// Rows are WACC values, columns the second axis.
fn sensitivity_section(grid: &SensitivityOutput) -> Section {
    let corner = format!("{} \\ {}", grid.variable_1_name, grid.variable_2_name);
    let mut headers = vec![corner];
    headers.extend(grid.variable_2_values.iter().map(|v| v.normalize().to_string()));
    let mut section = Section {
        name: format!("sensitivity:{}", grid.output_metric),
        headers,
        rows: Vec::new(),
    };
    for (wacc, row) in grid.variable_1_values.iter().zip(&grid.matrix) {
        let mut cells = vec![Cell::Rate(*wacc)];
        cells.extend(row.iter().map(|v| Cell::Money(*v)));
        section.push(cells);
    }
    section
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

fn monte_carlo_sections(out: &McOutput) -> Vec<Section> {
    let s = &out.summary;
    let mut percentiles = Section::new(
        "distribution",
        &[
            "output", "mean", "std_dev", "p5", "p10", "p25", "p50", "p75", "p90", "p95",
        ],
    );
    for stats in [
        &s.standalone_share_price,
        &s.acquirer_share_price,
        &s.acquirer_premium,
        &s.standalone_enterprise_value,
        &s.acquirer_enterprise_value,
    ] {
        percentiles.push(percentile_row(stats));
    }

    let mut run = Section::new("run", &["item", "value"]);
    run.push(vec![Cell::text("base_scenario"), Cell::text(out.base_scenario.as_str())]);
    run.push(vec![Cell::text("seed"), Cell::text(out.seed.to_string())]);
    run.push(vec![Cell::text("n_samples"), Cell::text(out.n_samples.to_string())]);
    run.push(vec![
        Cell::text("failed_samples"),
        Cell::text(out.failures.len().to_string()),
    ]);
    if let Some(offer) = &s.offer {
        run.push(vec![Cell::text("offer_price"), Cell::Float(offer.offer_price)]);
        run.push(vec![
            Cell::text("p_standalone_above_offer"),
            Cell::Float(offer.probability_standalone_above),
        ]);
        run.push(vec![
            Cell::text("p_acquirer_above_offer"),
            Cell::Float(offer.probability_acquirer_above),
        ]);
    }
    vec![percentiles, run]
}

fn percentile_row(stats: &McOutputStatistics) -> Vec<Cell> {
    let p = &stats.percentiles;
    vec![
        Cell::text(stats.name.as_str()),
        Cell::Float(stats.mean),
        Cell::Float(stats.std_dev),
        Cell::Float(p.p5),
        Cell::Float(p.p10),
        Cell::Float(p.p25),
        Cell::Float(p.p50),
        Cell::Float(p.p75),
        Cell::Float(p.p90),
        Cell::Float(p.p95),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use steel_dcf_core::model::{ModelConfig, ValuationModel};
    use steel_dcf_core::monte_carlo::{run_simulation, McConfig};
    use steel_dcf_core::scenarios::{get_scenario_presets, ScenarioType};

    fn analysis() -> Report {
        let model = ValuationModel::new(ModelConfig::reference()).unwrap();
        let scenario = get_scenario_presets()
            .unwrap()
            .remove(&ScenarioType::BaseCase)
            .unwrap();
        Report::Analysis(model.run_full_analysis(&scenario).unwrap())
    }

    #[test]
    fn test_analysis_renders_valuation_consolidated_and_segments() {
        let sections = analysis().sections();
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "valuation",
                "summary",
                "consolidated",
                "segment:flat_rolled",
                "segment:mini_mill",
                "segment:europe",
                "segment:tubular",
            ]
        );

        let consolidated = &sections[2];
        assert_eq!(consolidated.rows.len(), 10);
        assert_eq!(consolidated.rows[0][0], Cell::text("2025"));
        for section in &sections {
            for row in &section.rows {
                assert_eq!(row.len(), section.headers.len(), "{}", section.name);
            }
        }
    }

    #[test]
    fn test_valuation_bundle_ends_at_share_price() {
        let report = analysis();
        let Report::Analysis(out) = &report else {
            unreachable!()
        };
        let section = valuation_section(&out.result.standalone, &out.result.acquirer);
        let share = section
            .rows
            .iter()
            .find(|r| r[0] == Cell::text("share_price"))
            .unwrap();
        assert_eq!(share[1], Cell::Money(out.result.standalone.share_price));
        assert_eq!(share[2], Cell::Money(out.result.acquirer.share_price));
        assert!(report.headline()[0].starts_with("standalone "));
    }

    #[test]
    fn test_monte_carlo_percentile_table() {
        let model = ValuationModel::new(ModelConfig::reference()).unwrap();
        let scenario = get_scenario_presets()
            .unwrap()
            .remove(&ScenarioType::ManagementCase)
            .unwrap();
        let out = run_simulation(&model, &scenario, &McConfig::reference(), 16, 3).unwrap();
        let report = Report::MonteCarlo(out);
        let sections = report.sections();
        assert_eq!(sections[0].name, "distribution");
        assert_eq!(sections[0].rows.len(), 5);
        assert_eq!(sections[0].headers.len(), 10);
        assert_eq!(sections[0].rows[0][0], Cell::text("standalone_share_price"));
    }

    #[test]
    fn test_cell_formats() {
        let rate = Decimal::new(812, 4);
        assert_eq!(Cell::Rate(rate).display(), "8.12%");
        assert_eq!(Cell::Rate(rate).raw(), "0.0812");
        assert_eq!(Cell::Money(Decimal::new(466, 1)).display(), "46.60");
        assert_eq!(Cell::Empty.raw(), "");
    }
}
