//! Observation Merging Engine
//!
//! Combines the statistical output of many independent simulation runs into a
//! single aggregate report. Payoff statistics are merged from per-run means and
//! standard deviations without access to raw agent samples, using compensated
//! summation throughout so large merged counts do not lose precision.

pub mod aggregate;
pub mod error;
pub mod kahan;
pub mod numbers;
pub mod observation;
pub mod options;
pub mod presets;
pub mod report;
pub mod sum_stats;

// Re-export commonly used types
pub use aggregate::{
    ObservationMerger, StddevAvailability, StrategyKey, StrategyStats, merge_observations,
};
pub use error::MergeError;
pub use kahan::KahanSum;
pub use observation::{Observation, PlayerObservation};
pub use options::MergeOptions;
pub use presets::PresetCombiner;
pub use report::{AggregateReport, ReportFeatures, StrategySummary};
pub use sum_stats::{StatsError, SumStats};
