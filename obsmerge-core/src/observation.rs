//! Parsed form of a single observation file.
//!
//! An observation is the summarised output of one simulation run: global
//! feature values, the run configuration, and one record per
//! (role, strategy) group of agents with their mean payoff.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;

use crate::error::MergeError;
use crate::numbers::{scalar_to_count, scalar_to_f64};
use crate::options::MergeOptions;

#[derive(Debug, Deserialize)]
struct RawObservation {
    features: Map<String, Value>,
    players: Vec<RawPlayer>,
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    role: String,
    strategy: String,
    payoff: Value,
    features: Map<String, Value>,
}

/// One simulation run's summary, validated and converted to numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Global features, excluding the configuration object.
    pub features: BTreeMap<String, f64>,
    /// Run configuration, kept verbatim.
    pub config: Map<String, Value>,
    /// Number of simulations behind every payoff mean in this observation.
    pub num_sims: u64,
    pub players: Vec<PlayerObservation>,
}

/// Mean payoff and features of one (role, strategy) group within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerObservation {
    pub role: String,
    pub strategy: String,
    pub payoff: f64,
    pub features: BTreeMap<String, f64>,
}

impl PlayerObservation {
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }
}

impl Observation {
    /// Parse an observation from a JSON reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid, a required key is missing, or
    /// a feature or payoff is not numeric.
    pub fn from_reader<R: Read>(reader: R, options: &MergeOptions) -> Result<Self, MergeError> {
        let raw: RawObservation = serde_json::from_reader(reader)?;
        Self::from_raw(raw, options)
    }

    /// Parse an observation from JSON text.
    ///
    /// # Errors
    ///
    /// See [`Observation::from_reader`].
    pub fn from_json_str(text: &str, options: &MergeOptions) -> Result<Self, MergeError> {
        let raw: RawObservation = serde_json::from_str(text)?;
        Self::from_raw(raw, options)
    }

    /// Convert an already parsed JSON document.
    ///
    /// # Errors
    ///
    /// See [`Observation::from_reader`].
    pub fn from_value(value: Value, options: &MergeOptions) -> Result<Self, MergeError> {
        let raw: RawObservation = serde_json::from_value(value)?;
        Self::from_raw(raw, options)
    }

    fn from_raw(raw: RawObservation, options: &MergeOptions) -> Result<Self, MergeError> {
        let RawObservation {
            mut features,
            players,
        } = raw;

        let config_path = format!("features.{}", options.config_key);
        let config = match features.remove(&options.config_key) {
            Some(Value::Object(config)) => config,
            Some(_) => return Err(MergeError::NotAnObject { path: config_path }),
            None => return Err(MergeError::MissingKey { path: config_path }),
        };
        let num_sims = read_num_sims(&config, &config_path, &options.num_sims_key)?;
        let features = numeric_map(features, "features")?;
        let players = players
            .into_iter()
            .enumerate()
            .map(|(index, player)| PlayerObservation::from_raw(player, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            features,
            config,
            num_sims,
            players,
        })
    }
}

impl PlayerObservation {
    fn from_raw(raw: RawPlayer, index: usize) -> Result<Self, MergeError> {
        let prefix = format!("players[{index}]");
        let payoff = scalar_to_f64(&raw.payoff).ok_or_else(|| MergeError::NotNumeric {
            path: format!("{prefix}.payoff"),
            value: raw.payoff.clone(),
        })?;
        let features = numeric_map(raw.features, &format!("{prefix}.features"))?;
        Ok(Self {
            role: raw.role,
            strategy: raw.strategy,
            payoff,
            features,
        })
    }
}

fn read_num_sims(
    config: &Map<String, Value>,
    config_path: &str,
    key: &str,
) -> Result<u64, MergeError> {
    let path = format!("{config_path}.{key}");
    let value = config
        .get(key)
        .ok_or_else(|| MergeError::MissingKey { path: path.clone() })?;
    match scalar_to_count(value) {
        Some(count) if count > 0 => Ok(count),
        _ => Err(MergeError::InvalidSimCount {
            path,
            value: value.clone(),
        }),
    }
}

fn numeric_map(
    entries: Map<String, Value>,
    prefix: &str,
) -> Result<BTreeMap<String, f64>, MergeError> {
    entries
        .into_iter()
        .map(|(name, value)| match scalar_to_f64(&value) {
            Some(number) => Ok((name, number)),
            None => Err(MergeError::NotNumeric {
                path: format!("{prefix}.{name}"),
                value,
            }),
        })
        .collect()
}
