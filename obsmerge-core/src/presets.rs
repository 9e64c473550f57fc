//! Side-by-side combination of observations from differently configured
//! preset runs.
//!
//! Unlike [`crate::ObservationMerger`] nothing is averaged: every feature is
//! prefixed with the run's label so several market presets can be compared in
//! one document.

use serde_json::{Map, Value};

use crate::error::MergeError;
use crate::numbers::scalar_to_f64;
use crate::options::MergeOptions;

/// Builds a combined document from labelled observations.
#[derive(Debug, Clone, Default)]
pub struct PresetCombiner {
    options: MergeOptions,
    features: Map<String, Value>,
    entries: Map<String, Value>,
}

impl PresetCombiner {
    #[must_use]
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add one observation under `label`.
    ///
    /// Features become `<label>_<feature>`, while the configuration and the
    /// player list are carried verbatim as `<label>_config` and
    /// `<label>_players`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document lacks `features`, `players` or the
    /// configuration, or if a feature is not numeric.
    pub fn add(&mut self, label: &str, observation: Value) -> Result<(), MergeError> {
        let Value::Object(mut root) = observation else {
            return Err(MergeError::NotAnObject {
                path: label.to_string(),
            });
        };
        let mut features = match root.remove("features") {
            Some(Value::Object(features)) => features,
            Some(_) => {
                return Err(MergeError::NotAnObject {
                    path: "features".to_string(),
                });
            }
            None => {
                return Err(MergeError::MissingKey {
                    path: "features".to_string(),
                });
            }
        };
        let players = root.remove("players").ok_or_else(|| MergeError::MissingKey {
            path: "players".to_string(),
        })?;
        let config = features
            .remove(&self.options.config_key)
            .ok_or_else(|| MergeError::MissingKey {
                path: format!("features.{}", self.options.config_key),
            })?;

        for (name, value) in features {
            let number = scalar_to_f64(&value).ok_or_else(|| MergeError::NotNumeric {
                path: format!("features.{name}"),
                value: value.clone(),
            })?;
            self.features
                .insert(format!("{label}_{name}"), Value::from(number));
        }
        self.entries.insert(format!("{label}_config"), config);
        self.entries.insert(format!("{label}_players"), players);
        Ok(())
    }

    /// Finish the combined document.
    #[must_use]
    pub fn finish(self) -> Value {
        let mut root = self.entries;
        root.insert("features".to_string(), Value::Object(self.features));
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn preset(surplus: Value, market: &str) -> Value {
        json!({
            "features": { "surplus": surplus, "config": { "market": market, "numSims": 1 } },
            "players": [ { "role": "buyer", "strategy": "ZI", "payoff": 1.0, "features": {} } ]
        })
    }

    #[test]
    fn prefixes_features_and_carries_config() {
        let mut combiner = PresetCombiner::default();
        combiner.add("CALL", preset(json!(10.0), "call")).unwrap();
        combiner.add("CDA", preset(json!("12.5"), "cda")).unwrap();
        let combined = combiner.finish();

        assert_eq!(combined["features"]["CALL_surplus"], json!(10.0));
        assert_eq!(combined["features"]["CDA_surplus"], json!(12.5));
        assert_eq!(combined["CDA_config"]["market"], json!("cda"));
        assert_eq!(combined["CALL_players"][0]["strategy"], json!("ZI"));
        assert!(combined["features"].get("CALL_config").is_none());
    }

    #[test]
    fn requires_config() {
        let mut combiner = PresetCombiner::default();
        let err = combiner
            .add("CALL", json!({ "features": { "surplus": 1.0 }, "players": [] }))
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingKey { ref path } if path == "features.config"));
    }

    #[test]
    fn rejects_non_numeric_features() {
        let mut combiner = PresetCombiner::default();
        let err = combiner.add("CALL", preset(json!("n/a"), "call")).unwrap_err();
        assert!(err.is_malformed());
    }
}
