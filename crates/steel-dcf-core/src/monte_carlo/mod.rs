pub mod config;
pub mod sampling;
pub mod simulation;
pub mod statistics;

pub use config::{McConfig, McCorrelation, McDistribution, McTarget, McVariable};
pub use sampling::{sample_design, DesignMatrix};
pub use simulation::{run_simulation, McFailure, McOutput, McSampleResult, McSummary};
pub use statistics::{compute_statistics, McOutputStatistics, McPercentiles};
