//! Final merged report.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::aggregate::{ObservationMerger, StrategyKey, StrategyStats};
use crate::error::MergeError;
use crate::sum_stats::StatsError;

/// Merged statistics of a whole run of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub features: ReportFeatures,
    /// Role, then strategy, to payoff summary.
    pub players: BTreeMap<String, BTreeMap<String, StrategySummary>>,
}

/// Feature means plus the configuration of the last merged observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFeatures {
    pub config: Map<String, Value>,
    #[serde(flatten)]
    pub means: BTreeMap<String, f64>,
}

/// Payoff statistics of one (role, strategy) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    /// Mean payoff over every agent in every simulation.
    pub mean: f64,
    /// Standard deviation over every agent payoff; only present when every
    /// observation in the run supplied per-agent standard deviations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_sample_stddev: Option<f64>,
    /// Standard deviation of the per-observation mean payoffs.
    pub egta_sample_stddev: f64,
    pub features: BTreeMap<String, f64>,
}

impl AggregateReport {
    /// Build the report from a finished merger.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::EmptyInput`] when no observation was merged and
    /// [`MergeError::InsufficientSamples`] when a statistic lacks samples.
    pub fn build(merger: ObservationMerger) -> Result<Self, MergeError> {
        let include_true_stddev = merger.stddev_availability().reports_true_stddev();
        let ObservationMerger {
            features,
            strategies,
            config,
            ..
        } = merger;
        let Some(config) = config else {
            return Err(MergeError::EmptyInput);
        };

        let means = features
            .iter()
            .map(|(name, stats)| {
                let mean = labelled(stats.mean(), || format!("features.{name}"))?;
                Ok((name.clone(), mean))
            })
            .collect::<Result<BTreeMap<_, _>, MergeError>>()?;

        let mut players: BTreeMap<String, BTreeMap<String, StrategySummary>> = BTreeMap::new();
        for (key, stats) in strategies {
            let summary = StrategySummary::build(&key, &stats, include_true_stddev)?;
            players
                .entry(key.role)
                .or_default()
                .insert(key.strategy, summary);
        }

        Ok(Self {
            features: ReportFeatures { config, means },
            players,
        })
    }

    #[must_use]
    pub fn strategy(&self, role: &str, strategy: &str) -> Option<&StrategySummary> {
        self.players.get(role)?.get(strategy)
    }

    #[must_use]
    pub fn feature_mean(&self, name: &str) -> Option<f64> {
        self.features.means.get(name).copied()
    }

    /// Iterate over every (role, strategy, summary) in sorted order.
    pub fn strategies(&self) -> impl Iterator<Item = (&str, &str, &StrategySummary)> {
        self.players.iter().flat_map(|(role, strategies)| {
            strategies
                .iter()
                .map(move |(strategy, summary)| (role.as_str(), strategy.as_str(), summary))
        })
    }
}

impl StrategySummary {
    fn build(
        key: &StrategyKey,
        stats: &StrategyStats,
        include_true_stddev: bool,
    ) -> Result<Self, MergeError> {
        let path = |field: &str| format!("players.{}.{}.{field}", key.role, key.strategy);
        let mean = labelled(stats.true_payoff.mean(), || path("mean"))?;
        let egta_sample_stddev = labelled(stats.egta_payoff.sample_stddev(), || {
            path("egta_sample_stddev")
        })?;
        let true_sample_stddev = if include_true_stddev {
            Some(labelled(stats.true_payoff.sample_stddev(), || {
                path("true_sample_stddev")
            })?)
        } else {
            None
        };
        let features = stats
            .features
            .iter()
            .map(|(name, feature)| {
                let mean = labelled(feature.mean(), || path(&format!("features.{name}")))?;
                Ok((name.clone(), mean))
            })
            .collect::<Result<BTreeMap<_, _>, MergeError>>()?;

        Ok(Self {
            mean,
            true_sample_stddev,
            egta_sample_stddev,
            features,
        })
    }
}

fn labelled(
    result: Result<f64, StatsError>,
    statistic: impl FnOnce() -> String,
) -> Result<f64, MergeError> {
    result.map_err(|source| MergeError::insufficient(statistic(), source))
}
