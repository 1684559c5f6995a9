pub mod presets;
pub mod sensitivity;
pub mod weighting;

pub use presets::{
    base_wacc_inputs, default_scenario_weights, domestic_wacc_input, get_scenario_presets,
    get_synergy_presets, ScenarioType,
};
pub use sensitivity::{wacc_sensitivity, SensitivityInput, SensitivityOutput, SweepAxis};
pub use weighting::{calculate_probability_weighted_valuation, WeightedValuation};
