use std::ops::AddAssign;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::capital_projects::CapitalProject;
use super::price_volume::PriceVolumeEngine;
use super::UNIT_SCALE;
use crate::error::SteelDcfError;
use crate::market::{Segment, SegmentConfig};
use crate::types::{Money, PricePerTon, Rate};
use crate::SteelDcfResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DAYS_IN_YEAR: Decimal = dec!(365);

/// Lowest EBITDA margin any segment can print.
pub const MARGIN_FLOOR: Rate = dec!(0.02);
/// Highest EBITDA margin any segment can print.
pub const MARGIN_CAP: Rate = dec!(0.30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Additive line items shared by segment and consolidated rows ($M unless noted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementLines {
    /// kt
    pub shipments_kt: Decimal,
    pub revenue: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub nopat: Money,
    pub gross_cash_flow: Money,
    pub maintenance_capex: Money,
    pub project_capex: Money,
    pub total_capex: Money,
    pub working_capital: Money,
    pub delta_working_capital: Money,
    pub fcf: Money,
    pub project_revenue: Money,
    pub project_ebitda: Money,
}

impl StatementLines {
    /// Every line with its name, in reporting order.
    pub fn labelled(&self) -> [(&'static str, Money); 15] {
        [
            ("shipments_kt", self.shipments_kt),
            ("revenue", self.revenue),
            ("ebitda", self.ebitda),
            ("depreciation", self.depreciation),
            ("ebit", self.ebit),
            ("nopat", self.nopat),
            ("gross_cash_flow", self.gross_cash_flow),
            ("maintenance_capex", self.maintenance_capex),
            ("project_capex", self.project_capex),
            ("total_capex", self.total_capex),
            ("working_capital", self.working_capital),
            ("delta_working_capital", self.delta_working_capital),
            ("fcf", self.fcf),
            ("project_revenue", self.project_revenue),
            ("project_ebitda", self.project_ebitda),
        ]
    }
}

impl AddAssign<&StatementLines> for StatementLines {
    fn add_assign(&mut self, rhs: &StatementLines) {
        self.shipments_kt += rhs.shipments_kt;
        self.revenue += rhs.revenue;
        self.ebitda += rhs.ebitda;
        self.depreciation += rhs.depreciation;
        self.ebit += rhs.ebit;
        self.nopat += rhs.nopat;
        self.gross_cash_flow += rhs.gross_cash_flow;
        self.maintenance_capex += rhs.maintenance_capex;
        self.project_capex += rhs.project_capex;
        self.total_capex += rhs.total_capex;
        self.working_capital += rhs.working_capital;
        self.delta_working_capital += rhs.delta_working_capital;
        self.fcf += rhs.fcf;
        self.project_revenue += rhs.project_revenue;
        self.project_ebitda += rhs.project_ebitda;
    }
}

/// One projected year of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentYear {
    pub year: i32,
    pub realized_price: PricePerTon,
    /// EBITDA / revenue, 0 when revenue is 0
    pub ebitda_margin: Rate,
    /// Margin the price model applied to base operations (after the clamp)
    pub operating_margin: Rate,
    #[serde(flatten)]
    pub lines: StatementLines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProjection {
    pub segment: Segment,
    pub rows: Vec<SegmentYear>,
}

impl SegmentProjection {
    pub fn row(&self, year: i32) -> Option<&SegmentYear> {
        self.rows.iter().find(|r| r.year == year)
    }
}

/// A capital project switched on for this run, with the haircut already
/// resolved (1.0 for committed projects).
#[derive(Debug, Clone, Copy)]
pub struct EnabledProject<'a> {
    pub project: &'a CapitalProject,
    pub execution: Rate,
}

// ---------------------------------------------------------------------------
// Margin and working-capital models
// ---------------------------------------------------------------------------

/// Margin implied by the price model before the floor/cap.
pub fn unclamped_margin(config: &SegmentConfig, price: PricePerTon) -> Rate {
    config.base_ebitda_margin + config.margin_sensitivity * (price - config.base_price) / dec!(100)
}

/// EBITDA margin at `price`, held inside [`MARGIN_FLOOR`, `MARGIN_CAP`].
pub fn ebitda_margin(config: &SegmentConfig, price: PricePerTon) -> Rate {
    unclamped_margin(config, price).clamp(MARGIN_FLOOR, MARGIN_CAP)
}

/// Receivables + inventory - payables from day counts.
pub fn working_capital(config: &SegmentConfig, revenue: Money, ebitda: Money) -> Money {
    let cogs = revenue - ebitda;
    revenue * config.dso / DAYS_IN_YEAR + cogs * config.dih / DAYS_IN_YEAR
        - cogs * config.dpo / DAYS_IN_YEAR
}

fn safe_divide(numerator: Money, denominator: Money) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Project one segment over `years`.
///
/// Year 0 working capital is the base-year level at base price and base
/// shipments, so the first ΔWC reflects the move into the scenario.
/// `projects` may contain projects of any segment; only this segment's are
/// picked up.
pub fn project_segment(
    segment: Segment,
    engine: &PriceVolumeEngine<'_>,
    config: &SegmentConfig,
    projects: &[EnabledProject<'_>],
    years: &[i32],
    cash_tax_rate: Rate,
    warnings: &mut Vec<String>,
) -> SteelDcfResult<SegmentProjection> {
    if years.is_empty() {
        return Err(SteelDcfError::InsufficientData(
            "projection horizon is empty".into(),
        ));
    }

    let base_revenue = config.base_price * config.base_shipments() / UNIT_SCALE;
    let base_ebitda = base_revenue * config.base_ebitda_margin;
    let mut prior_wc = working_capital(config, base_revenue, base_ebitda);
    let mut clamped_years = Vec::new();

    let own_projects: Vec<&EnabledProject<'_>> =
        projects.iter().filter(|p| p.project.segment == segment).collect();

    let mut rows = Vec::with_capacity(years.len());
    for &year in years {
        let price = engine.price(segment, year)?;
        let shipments = engine.volume(segment, year)?;
        let operating_revenue = price * shipments / UNIT_SCALE;

        let raw_margin = unclamped_margin(config, price);
        let operating_margin = raw_margin.clamp(MARGIN_FLOOR, MARGIN_CAP);
        if operating_margin != raw_margin {
            clamped_years.push(year);
        }
        let operating_ebitda = operating_revenue * operating_margin;

        let mut project_revenue = Decimal::ZERO;
        let mut project_ebitda = Decimal::ZERO;
        let mut project_capex = Decimal::ZERO;
        for enabled in &own_projects {
            project_revenue += enabled.project.revenue(year, price) * enabled.execution;
            project_ebitda += enabled.project.project_ebitda(year, price) * enabled.execution;
            project_capex += enabled.project.capex(year);
        }

        let revenue = operating_revenue + project_revenue;
        let ebitda = operating_ebitda + project_ebitda;
        let depreciation = revenue * config.da_pct_revenue;
        let ebit = ebitda - depreciation;
        let nopat = ebit * (Decimal::ONE - cash_tax_rate);
        let gross_cash_flow = nopat + depreciation;
        let maintenance_capex = revenue * config.maintenance_capex_pct_revenue;
        let total_capex = maintenance_capex + project_capex;

        let wc = working_capital(config, revenue, ebitda);
        let delta_working_capital = wc - prior_wc;
        prior_wc = wc;

        let fcf = gross_cash_flow - total_capex - delta_working_capital;

        rows.push(SegmentYear {
            year,
            realized_price: price,
            ebitda_margin: safe_divide(ebitda, revenue),
            operating_margin,
            lines: StatementLines {
                shipments_kt: shipments,
                revenue,
                ebitda,
                depreciation,
                ebit,
                nopat,
                gross_cash_flow,
                maintenance_capex,
                project_capex,
                total_capex,
                working_capital: wc,
                delta_working_capital,
                fcf,
                project_revenue,
                project_ebitda,
            },
        });
    }

    if let (Some(first), Some(last)) = (clamped_years.first(), clamped_years.last()) {
        warnings.push(format!(
            "{} EBITDA margin held at the [{MARGIN_FLOOR}, {MARGIN_CAP}] bound in {} year(s) ({first}-{last})",
            segment.key(),
            clamped_years.len()
        ));
    }

    Ok(SegmentProjection { segment, rows })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
