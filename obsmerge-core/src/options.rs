//! Reserved key names used when reading observations.
use serde::{Deserialize, Serialize};

/// Names of the reserved keys inside an observation document.
///
/// Observation files written by older simulator builds used different
/// spellings, so every key can be overridden from a JSON options file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Feature holding the run configuration object.
    #[serde(default = "MergeOptions::default_config_key")]
    pub config_key: String,
    /// Configuration entry holding the number of simulations behind each payoff.
    #[serde(default = "MergeOptions::default_num_sims_key")]
    pub num_sims_key: String,
    /// Player feature holding the standard deviation of per-agent payoffs.
    #[serde(default = "MergeOptions::default_payoff_stddev_key")]
    pub payoff_stddev_key: String,
}

impl MergeOptions {
    fn default_config_key() -> String {
        "config".to_string()
    }

    fn default_num_sims_key() -> String {
        "numSims".to_string()
    }

    fn default_payoff_stddev_key() -> String {
        "payoff_stddev".to_string()
    }

    /// Parse options from JSON, filling in defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object of string fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            config_key: Self::default_config_key(),
            num_sims_key: Self::default_num_sims_key(),
            payoff_stddev_key: Self::default_payoff_stddev_key(),
        }
    }
}
