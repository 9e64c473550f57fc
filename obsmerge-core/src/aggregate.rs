//! Hierarchical aggregation of observations.
//!
//! [`ObservationMerger`] keeps one [`SumStats`] per key it has seen: one per
//! global feature, and per (role, strategy) a "true" payoff statistic weighted
//! by the number of simulations, an "egta" statistic over per-observation
//! mean payoffs, and one statistic per player feature. Keys are discovered
//! from the data; nothing is declared up front.

use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::MergeError;
use crate::observation::Observation;
use crate::options::MergeOptions;
use crate::report::AggregateReport;
use crate::sum_stats::SumStats;

/// Whether every merged player record carried a payoff standard deviation.
///
/// Once any record lacks it the run can no longer report a true standard
/// deviation; the state never returns to `Complete`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StddevAvailability {
    /// No observation has been merged yet.
    #[default]
    Unobserved,
    /// Every player record so far supplied a standard deviation.
    Complete,
    /// At least one player record did not.
    Incomplete,
}

impl StddevAvailability {
    /// Fold in whether the next observation supplied every standard deviation.
    #[must_use]
    pub const fn observe(self, supplied: bool) -> Self {
        match (self, supplied) {
            (Self::Incomplete, _) | (_, false) => Self::Incomplete,
            _ => Self::Complete,
        }
    }

    /// Combine the availability of two disjoint sets of observations.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Incomplete, _) | (_, Self::Incomplete) => Self::Incomplete,
            (Self::Complete, _) | (_, Self::Complete) => Self::Complete,
            (Self::Unobserved, Self::Unobserved) => Self::Unobserved,
        }
    }

    #[must_use]
    pub const fn reports_true_stddev(self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Role and strategy identifying a class of simulated agents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyKey {
    pub role: String,
    pub strategy: String,
}

impl StrategyKey {
    #[must_use]
    pub fn new(role: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            strategy: strategy.into(),
        }
    }
}

/// Payoff and feature statistics of one (role, strategy) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyStats {
    /// Agent-level payoff statistic, each observation weighted by its
    /// simulation count.
    pub true_payoff: SumStats,
    /// Spread of per-observation mean payoffs.
    pub egta_payoff: SumStats,
    pub features: BTreeMap<String, SumStats>,
}

impl StrategyStats {
    fn absorb(&mut self, key: &StrategyKey, other: &Self) -> Result<(), MergeError> {
        let path = |field: &str| format!("players.{}.{}.{field}", key.role, key.strategy);
        self.true_payoff
            .absorb(&other.true_payoff)
            .map_err(|source| MergeError::overflow(path("mean"), source))?;
        self.egta_payoff
            .absorb(&other.egta_payoff)
            .map_err(|source| MergeError::overflow(path("egta_sample_stddev"), source))?;
        for (name, stats) in &other.features {
            self.features
                .entry(name.clone())
                .or_default()
                .absorb(stats)
                .map_err(|source| {
                    MergeError::overflow(path(&format!("features.{name}")), source)
                })?;
        }
        Ok(())
    }
}

/// Accumulates observations one at a time into mergeable statistics.
#[derive(Debug, Clone, Default)]
pub struct ObservationMerger {
    options: MergeOptions,
    observations: u64,
    pub(crate) features: BTreeMap<String, SumStats>,
    pub(crate) strategies: BTreeMap<StrategyKey, StrategyStats>,
    stddev_availability: StddevAvailability,
    pub(crate) config: Option<Map<String, Value>>,
}

impl ObservationMerger {
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn options(&self) -> &MergeOptions {
        &self.options
    }

    #[must_use]
    pub const fn observation_count(&self) -> u64 {
        self.observations
    }

    #[must_use]
    pub const fn stddev_availability(&self) -> StddevAvailability {
        self.stddev_availability
    }

    #[must_use]
    pub fn strategy(&self, key: &StrategyKey) -> Option<&StrategyStats> {
        self.strategies.get(key)
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&SumStats> {
        self.features.get(name)
    }

    /// Fold one observation into the run statistics.
    ///
    /// A missing payoff standard deviation is treated as zero for the true
    /// statistic, which understates its variance; the run then stops
    /// reporting the true standard deviation altogether.
    ///
    /// # Errors
    ///
    /// Returns an error if a (role, strategy) sample count would overflow
    /// `u64`. The merger is then partially updated and should be discarded.
    pub fn ingest(&mut self, observation: Observation) -> Result<(), MergeError> {
        let Observation {
            features,
            config,
            num_sims,
            players,
        } = observation;
        self.observations += 1;
        debug!(
            "merging observation {} ({} features, {} players, numSims={num_sims})",
            self.observations,
            features.len(),
            players.len()
        );

        for (name, value) in features {
            self.features.entry(name).or_default().add_one(value);
        }

        let stddev_key = self.options.payoff_stddev_key.as_str();
        let supplied = players
            .iter()
            .all(|player| player.features.contains_key(stddev_key));
        let previous = self.stddev_availability;
        self.stddev_availability = previous.observe(supplied);
        if previous != StddevAvailability::Incomplete
            && self.stddev_availability == StddevAvailability::Incomplete
        {
            info!(
                "observation {} lacks `{stddev_key}` for some player; \
                 true_sample_stddev disabled for this run",
                self.observations
            );
        }

        let mut observation_means: BTreeMap<StrategyKey, SumStats> = BTreeMap::new();
        for player in players {
            let stddev = player.feature(stddev_key).unwrap_or(0.0);
            let key = StrategyKey::new(player.role, player.strategy);
            let stats = self.strategies.entry(key.clone()).or_default();
            stats
                .true_payoff
                .add_mean_stddev(num_sims, player.payoff, stddev)
                .map_err(|source| {
                    MergeError::overflow(
                        format!("players.{}.{}.mean", key.role, key.strategy),
                        source,
                    )
                })?;
            for (name, value) in player.features {
                stats.features.entry(name).or_default().add_one(value);
            }
            observation_means
                .entry(key)
                .or_default()
                .add_one(player.payoff);
        }

        for (key, payoffs) in observation_means {
            let mean = payoffs.mean().map_err(|source| {
                MergeError::insufficient(
                    format!("players.{}.{}.payoff", key.role, key.strategy),
                    source,
                )
            })?;
            self.strategies
                .entry(key)
                .or_default()
                .egta_payoff
                .add_one(mean);
        }

        if let Some(previous) = &self.config
            && !previous.keys().eq(config.keys())
        {
            warn!(
                "observation {} has a different `{}` key set than the previous observation",
                self.observations, self.options.config_key
            );
        }
        self.config = Some(config);
        Ok(())
    }

    /// Merge statistics gathered by another merger over disjoint observations.
    ///
    /// Statistics combine key by key; the other merger's configuration wins
    /// when it saw any observation.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::CountOverflow`] when a combined sample count
    /// would overflow `u64`. This merger is then partially updated and should
    /// be discarded.
    pub fn absorb(&mut self, other: Self) -> Result<(), MergeError> {
        self.observations += other.observations;
        for (name, stats) in &other.features {
            self.features
                .entry(name.clone())
                .or_default()
                .absorb(stats)
                .map_err(|source| MergeError::overflow(format!("features.{name}"), source))?;
        }
        for (key, stats) in &other.strategies {
            self.strategies
                .entry(key.clone())
                .or_default()
                .absorb(key, stats)?;
        }
        self.stddev_availability = self
            .stddev_availability
            .combine(other.stddev_availability);
        if other.config.is_some() {
            self.config = other.config;
        }
        Ok(())
    }

    /// Build the aggregate report, consuming the merger.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::EmptyInput`] when nothing was merged and
    /// [`MergeError::InsufficientSamples`] when a reported statistic lacks
    /// samples, such as an egta standard deviation for a strategy seen in a
    /// single observation.
    pub fn finish(self) -> Result<AggregateReport, MergeError> {
        AggregateReport::build(self)
    }
}

/// Merge a lazy sequence of observations into one report, stopping at the
/// first error.
///
/// # Errors
///
/// Returns the first error produced by the sequence, or any error raised
/// while merging or building the report.
pub fn merge_observations<I, E>(
    observations: I,
    options: MergeOptions,
) -> Result<AggregateReport, E>
where
    I: IntoIterator<Item = Result<Observation, E>>,
    E: From<MergeError>,
{
    let mut merger = ObservationMerger::new(options);
    for observation in observations {
        merger.ingest(observation?)?;
    }
    Ok(merger.finish()?)
}
