pub mod capital_projects;
pub mod consolidation;
pub mod financials;
pub mod price_volume;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// kt x $/t -> $M
pub const UNIT_SCALE: Decimal = dec!(1000);

pub use capital_projects::{CapitalProject, DynamicProjectParams, ProjectCatalog, ProjectEbitda};
pub use consolidation::{consolidate, verify_aggregation, AggregationReport, ConsolidatedYear};
pub use financials::{
    project_segment, EnabledProject, SegmentProjection, SegmentYear, StatementLines,
};
pub use price_volume::PriceVolumeEngine;
