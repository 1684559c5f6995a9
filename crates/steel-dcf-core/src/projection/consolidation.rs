use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::financials::{SegmentProjection, StatementLines};
use crate::error::SteelDcfError;
use crate::market::Segment;
use crate::types::{Money, Rate};
use crate::SteelDcfResult;

/// Largest segment-sum mismatch ($M) tolerated on any line.
pub const AGGREGATION_TOLERANCE: Money = dec!(0.01);

/// One consolidated year. Additive lines are exact segment sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedYear {
    pub year: i32,
    /// Derived as EBITDA / revenue, never summed
    pub ebitda_margin: Rate,
    #[serde(flatten)]
    pub lines: StatementLines,
}

/// Sum segment tables year by year.
///
/// Every segment must cover the same years in the same order.
pub fn consolidate(
    segments: &BTreeMap<Segment, SegmentProjection>,
) -> SteelDcfResult<Vec<ConsolidatedYear>> {
    let mut tables = segments.values();
    let first = tables.next().ok_or_else(|| {
        SteelDcfError::InsufficientData("no segment projections to consolidate".into())
    })?;
    let years: Vec<i32> = first.rows.iter().map(|r| r.year).collect();
    for table in tables {
        let other: Vec<i32> = table.rows.iter().map(|r| r.year).collect();
        if other != years {
            return Err(SteelDcfError::InsufficientData(format!(
                "segment '{}' covers different years than '{}'",
                table.segment.key(),
                first.segment.key()
            )));
        }
    }

    let consolidated = years
        .iter()
        .enumerate()
        .map(|(idx, &year)| {
            let mut lines = StatementLines::default();
            for table in segments.values() {
                lines += &table.rows[idx].lines;
            }
            let ebitda_margin = if lines.revenue.is_zero() {
                Decimal::ZERO
            } else {
                lines.ebitda / lines.revenue
            };
            ConsolidatedYear {
                year,
                ebitda_margin,
                lines,
            }
        })
        .collect();
    Ok(consolidated)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationBreach {
    pub year: i32,
    pub line: String,
    pub segment_sum: Money,
    pub consolidated: Money,
    pub difference: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationReport {
    pub checks: usize,
    pub max_abs_difference: Money,
    pub breaches: Vec<AggregationBreach>,
}

impl AggregationReport {
    pub fn passed(&self) -> bool {
        self.breaches.is_empty()
    }
}

/// Recompute every additive line from the segment tables and compare.
pub fn verify_aggregation(
    segments: &BTreeMap<Segment, SegmentProjection>,
    consolidated: &[ConsolidatedYear],
) -> AggregationReport {
    let mut checks = 0;
    let mut max_abs_difference = Decimal::ZERO;
    let mut breaches = Vec::new();

    for row in consolidated {
        let mut sums = StatementLines::default();
        let mut missing = false;
        for table in segments.values() {
            match table.row(row.year) {
                Some(seg_row) => sums += &seg_row.lines,
                None => missing = true,
            }
        }
        if missing {
            breaches.push(AggregationBreach {
                year: row.year,
                line: "segment_rows".into(),
                segment_sum: Decimal::ZERO,
                consolidated: Decimal::ZERO,
                difference: Decimal::ZERO,
            });
            continue;
        }
        let pairs = sums.labelled().into_iter().zip(row.lines.labelled());
        for ((line, expected), (_, actual)) in pairs {
            checks += 1;
            let difference = actual - expected;
            max_abs_difference = max_abs_difference.max(difference.abs());
            if difference.abs() > AGGREGATION_TOLERANCE {
                breaches.push(AggregationBreach {
                    year: row.year,
                    line: line.to_string(),
                    segment_sum: expected,
                    consolidated: actual,
                    difference,
                });
            }
        }
    }

    AggregationReport {
        checks,
        max_abs_difference,
        breaches,
    }
}
