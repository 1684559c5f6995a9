use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::UNIT_SCALE;
use crate::error::SteelDcfError;
use crate::market::Segment;
use crate::time_value::{discount_factor, irr};
use crate::types::{Kilotons, Money, Multiple, PricePerTon, Rate};
use crate::SteelDcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Capacity-driven economics of a project that sells tons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicProjectParams {
    /// Nameplate capacity at full ramp (kt per year)
    pub nameplate_kt: Kilotons,
    pub ebitda_margin: Rate,
    /// Utilization by calendar year; the last entry carries forward
    pub ramp: BTreeMap<i32, Rate>,
    /// Fixed realized price ($/t) for products not priced off the segment
    /// benchmark, e.g. iron ore pellets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_override: Option<PricePerTon>,
    /// EV/EBITDA multiple used when valuing the project on its own
    pub terminal_multiple: Multiple,
}

/// How a project's incremental EBITDA is specified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectEbitda {
    Dynamic(DynamicProjectParams),
    Scheduled { ebitda_by_year: BTreeMap<i32, Money> },
}

/// A named expansion or modernization investment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalProject {
    pub name: String,
    /// Segment the incremental volume and EBITDA are reported in
    pub segment: Segment,
    pub capex_by_year: BTreeMap<i32, Money>,
    /// Already under construction; immune to the execution-factor haircut
    #[serde(default)]
    pub committed: bool,
    /// Part of the target's standalone plan; always enabled and excluded from
    /// the financing-gap test
    #[serde(default)]
    pub baseline: bool,
    pub ebitda: ProjectEbitda,
}

impl CapitalProject {
    /// Utilization for `year`. Zero before the first ramp year.
    pub fn ramp_utilization(&self, year: i32) -> Rate {
        match &self.ebitda {
            ProjectEbitda::Dynamic(params) => params
                .ramp
                .range(..=year)
                .next_back()
                .map(|(_, u)| *u)
                .unwrap_or(Decimal::ZERO),
            ProjectEbitda::Scheduled { .. } => Decimal::ZERO,
        }
    }

    fn effective_price(params: &DynamicProjectParams, segment_price: PricePerTon) -> PricePerTon {
        params.price_override.unwrap_or(segment_price)
    }

    /// Incremental revenue ($M). Scheduled projects only carry EBITDA.
    pub fn revenue(&self, year: i32, segment_price: PricePerTon) -> Money {
        match &self.ebitda {
            ProjectEbitda::Dynamic(params) => {
                params.nameplate_kt
                    * self.ramp_utilization(year)
                    * Self::effective_price(params, segment_price)
                    / UNIT_SCALE
            }
            ProjectEbitda::Scheduled { .. } => Decimal::ZERO,
        }
    }

    /// Incremental EBITDA ($M) before any execution haircut.
    pub fn project_ebitda(&self, year: i32, segment_price: PricePerTon) -> Money {
        match &self.ebitda {
            ProjectEbitda::Dynamic(params) => {
                params.nameplate_kt
                    * self.ramp_utilization(year)
                    * Self::effective_price(params, segment_price)
                    * params.ebitda_margin
                    / UNIT_SCALE
            }
            ProjectEbitda::Scheduled { ebitda_by_year } => {
                ebitda_by_year.get(&year).copied().unwrap_or(Decimal::ZERO)
            }
        }
    }

    /// Haircut applied to this project's revenue and EBITDA.
    pub fn execution_multiplier(&self, execution_factor: Rate) -> Rate {
        if self.committed {
            Decimal::ONE
        } else {
            execution_factor
        }
    }

    pub fn capex(&self, year: i32) -> Money {
        self.capex_by_year.get(&year).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total_capex(&self) -> Money {
        self.capex_by_year.values().copied().sum()
    }

    pub fn terminal_multiple(&self) -> Option<Multiple> {
        match &self.ebitda {
            ProjectEbitda::Dynamic(params) => Some(params.terminal_multiple),
            ProjectEbitda::Scheduled { .. } => None,
        }
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        let field = |name: &str| format!("projects.{}.{name}", self.name);
        if self.name.trim().is_empty() {
            return Err(SteelDcfError::invalid("projects.name", "Project name cannot be empty"));
        }
        if self.capex_by_year.values().any(|c| *c < Decimal::ZERO) {
            return Err(SteelDcfError::invalid(field("capex_by_year"), "CapEx cannot be negative"));
        }
        if let ProjectEbitda::Dynamic(params) = &self.ebitda {
            if params.nameplate_kt <= Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    field("nameplate_kt"),
                    "Dynamic projects need a positive nameplate capacity",
                ));
            }
            if params.ramp.is_empty() {
                return Err(SteelDcfError::invalid(field("ramp"), "Ramp schedule cannot be empty"));
            }
            if params.ramp.values().any(|u| *u < Decimal::ZERO || *u > Decimal::ONE) {
                return Err(SteelDcfError::invalid(field("ramp"), "Utilization must be in [0, 1]"));
            }
            if params.ebitda_margin < Decimal::ZERO || params.ebitda_margin >= Decimal::ONE {
                return Err(SteelDcfError::invalid(
                    field("ebitda_margin"),
                    "Margin must be in [0, 1)",
                ));
            }
            if params.terminal_multiple < Decimal::ZERO {
                return Err(SteelDcfError::invalid(
                    field("terminal_multiple"),
                    "Terminal multiple cannot be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Every project the model knows about, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCatalog {
    pub projects: BTreeMap<String, CapitalProject>,
}

impl ProjectCatalog {
    pub fn new(projects: impl IntoIterator<Item = CapitalProject>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.name.clone(), p)).collect(),
        }
    }

    /// Announced investment program of the reference target.
    pub fn reference() -> Self {
        Self::new([
            CapitalProject {
                name: BIG_RIVER_2.into(),
                segment: Segment::MiniMill,
                capex_by_year: BTreeMap::from([(2025, dec!(800)), (2026, dec!(150))]),
                committed: true,
                baseline: true,
                ebitda: ProjectEbitda::Dynamic(DynamicProjectParams {
                    nameplate_kt: dec!(3000),
                    ebitda_margin: dec!(0.17),
                    ramp: BTreeMap::from([
                        (2025, dec!(0.15)),
                        (2026, dec!(0.45)),
                        (2027, dec!(0.75)),
                        (2028, dec!(0.90)),
                        (2029, dec!(1.0)),
                    ]),
                    price_override: None,
                    terminal_multiple: dec!(7.0),
                }),
            },
            CapitalProject {
                name: GARY_HOT_STRIP_MILL.into(),
                segment: Segment::FlatRolled,
                capex_by_year: BTreeMap::from([
                    (2025, dec!(150)),
                    (2026, dec!(300)),
                    (2027, dec!(250)),
                ]),
                committed: false,
                baseline: false,
                ebitda: ProjectEbitda::Scheduled {
                    ebitda_by_year: run_rate_schedule(
                        &[(2027, dec!(40)), (2028, dec!(110))],
                        2029,
                        2034,
                        dec!(150),
                    ),
                },
            },
            CapitalProject {
                name: MON_VALLEY_HOT_STRIP_MILL.into(),
                segment: Segment::FlatRolled,
                capex_by_year: BTreeMap::from([
                    (2026, dec!(200)),
                    (2027, dec!(400)),
                    (2028, dec!(300)),
                ]),
                committed: false,
                baseline: false,
                ebitda: ProjectEbitda::Scheduled {
                    ebitda_by_year: run_rate_schedule(
                        &[(2028, dec!(50)), (2029, dec!(120))],
                        2030,
                        2034,
                        dec!(160),
                    ),
                },
            },
            CapitalProject {
                name: KEETAC_DR_PELLETS.into(),
                segment: Segment::FlatRolled,
                capex_by_year: BTreeMap::from([
                    (2025, dec!(50)),
                    (2026, dec!(200)),
                    (2027, dec!(100)),
                ]),
                committed: false,
                baseline: false,
                ebitda: ProjectEbitda::Dynamic(DynamicProjectParams {
                    nameplate_kt: dec!(4000),
                    ebitda_margin: dec!(0.30),
                    ramp: BTreeMap::from([
                        (2027, dec!(0.50)),
                        (2028, dec!(0.85)),
                        (2029, dec!(1.0)),
                    ]),
                    price_override: Some(dec!(180)),
                    terminal_multiple: dec!(6.0),
                }),
            },
            CapitalProject {
                name: GREENFIELD_EAF.into(),
                segment: Segment::MiniMill,
                capex_by_year: BTreeMap::from([
                    (2027, dec!(800)),
                    (2028, dec!(1500)),
                    (2029, dec!(1200)),
                    (2030, dec!(500)),
                ]),
                committed: false,
                baseline: false,
                ebitda: ProjectEbitda::Dynamic(DynamicProjectParams {
                    nameplate_kt: dec!(3000),
                    ebitda_margin: dec!(0.17),
                    ramp: BTreeMap::from([
                        (2030, dec!(0.30)),
                        (2031, dec!(0.60)),
                        (2032, dec!(0.85)),
                        (2033, dec!(1.0)),
                    ]),
                    price_override: None,
                    terminal_multiple: dec!(6.5),
                }),
            },
        ])
    }

    pub fn get(&self, name: &str) -> SteelDcfResult<&CapitalProject> {
        self.projects
            .get(name)
            .ok_or_else(|| SteelDcfError::UnknownProject(name.to_string()))
    }

    /// Look up every enabled project, failing on the first unknown name.
    pub fn resolve<'a>(&'a self, names: &[String]) -> SteelDcfResult<Vec<&'a CapitalProject>> {
        names.iter().map(|n| self.get(n)).collect()
    }

    pub fn baseline_names(&self) -> Vec<String> {
        self.projects
            .values()
            .filter(|p| p.baseline)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn all_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn validate(&self) -> SteelDcfResult<()> {
        for (key, project) in &self.projects {
            if key != &project.name {
                return Err(SteelDcfError::invalid(
                    format!("projects.{key}"),
                    format!("catalog key does not match project name '{}'", project.name),
                ));
            }
            project.validate()?;
        }
        Ok(())
    }
}

pub const BIG_RIVER_2: &str = "big_river_2";
pub const GARY_HOT_STRIP_MILL: &str = "gary_hot_strip_mill";
pub const MON_VALLEY_HOT_STRIP_MILL: &str = "mon_valley_hot_strip_mill";
pub const KEETAC_DR_PELLETS: &str = "keetac_dr_pellets";
pub const GREENFIELD_EAF: &str = "greenfield_eaf";

fn run_rate_schedule(
    ramp: &[(i32, Money)],
    from: i32,
    to: i32,
    run_rate: Money,
) -> BTreeMap<i32, Money> {
    let mut schedule: BTreeMap<i32, Money> = ramp.iter().copied().collect();
    schedule.extend((from..=to).map(|y| (y, run_rate)));
    schedule
}

// ---------------------------------------------------------------------------
// Standalone project economics
// ---------------------------------------------------------------------------

/// Return profile of one project valued on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEconomics {
    pub name: String,
    pub segment: Segment,
    pub committed: bool,
    pub total_capex: Money,
    pub terminal_year_ebitda: Money,
    pub terminal_multiple: Multiple,
    pub terminal_value: Money,
    pub npv: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payback_year: Option<i32>,
}

/// Value a project on its own: after-tax EBITDA less CapEx each year plus an
/// exit at the project's terminal multiple (or `default_multiple` for
/// scheduled projects).
///
/// `segment_prices[i]` is the owning segment's price in `years[i]`.
pub fn evaluate_project(
    project: &CapitalProject,
    years: &[i32],
    segment_prices: &[PricePerTon],
    wacc: Rate,
    tax_rate: Rate,
    execution_factor: Rate,
    default_multiple: Multiple,
) -> SteelDcfResult<ProjectEconomics> {
    if years.is_empty() || years.len() != segment_prices.len() {
        return Err(SteelDcfError::invalid(
            "segment_prices",
            "Need one segment price per projection year",
        ));
    }

    let haircut = project.execution_multiplier(execution_factor);
    let mut flows = Vec::with_capacity(years.len() + 1);
    flows.push(Decimal::ZERO);
    let mut npv = Decimal::ZERO;
    let mut cumulative = Decimal::ZERO;
    let mut payback_year = None;
    let mut terminal_year_ebitda = Decimal::ZERO;

    for (idx, (&year, &price)) in years.iter().zip(segment_prices).enumerate() {
        let ebitda = project.project_ebitda(year, price) * haircut;
        let cash_flow = ebitda * (Decimal::ONE - tax_rate) - project.capex(year);
        npv += cash_flow * discount_factor(wacc, idx as u32 + 1)?;
        let was_negative = cumulative < Decimal::ZERO;
        cumulative += cash_flow;
        if payback_year.is_none() && was_negative && cumulative >= Decimal::ZERO {
            payback_year = Some(year);
        }
        flows.push(cash_flow);
        terminal_year_ebitda = ebitda;
    }

    let terminal_multiple = project.terminal_multiple().unwrap_or(default_multiple);
    let terminal_value = terminal_year_ebitda * terminal_multiple;
    npv += terminal_value * discount_factor(wacc, years.len() as u32)?;
    if let Some(last) = flows.last_mut() {
        *last += terminal_value;
    }

    Ok(ProjectEconomics {
        name: project.name.clone(),
        segment: project.segment,
        committed: project.committed,
        total_capex: project.total_capex(),
        terminal_year_ebitda,
        terminal_multiple,
        terminal_value,
        npv,
        irr: irr(&flows, dec!(0.10)).ok(),
        payback_year,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
