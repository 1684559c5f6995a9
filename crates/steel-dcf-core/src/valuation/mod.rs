pub mod dcf;
pub mod financing;
pub mod synergies;
pub mod wacc;

pub use dcf::{value, EquityBridge, ValuationResult, ValuationTerms};
pub use financing::{financing_impact, FinancingImpact, FinancingTerms};
pub use synergies::{synergy_npv, SynergyAssumptions, SynergyTerms, SynergyValuation};
pub use wacc::{
    calculate_wacc, cross_border_wacc, irp_convert, CrossBorderWacc, WaccInput, WaccInputs,
};
