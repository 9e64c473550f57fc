use serde_json::Value;
use thiserror::Error;

use crate::sum_stats::StatsError;

/// Errors raised while parsing observations or building the merged report.
///
/// Every variant is fatal for the run: no partial report is produced.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid observation JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required key `{path}`")]
    MissingKey { path: String },
    #[error("`{path}` must be a JSON object")]
    NotAnObject { path: String },
    #[error("`{path}` must be numeric (got {value})")]
    NotNumeric { path: String, value: Value },
    #[error("`{path}` must be a positive whole number of simulations (got {value})")]
    InvalidSimCount { path: String, value: Value },
    #[error("cannot compute {statistic}: {source}")]
    InsufficientSamples {
        statistic: String,
        source: StatsError,
    },
    #[error("`{statistic}` counts more samples than fit in a u64: {source}")]
    CountOverflow {
        statistic: String,
        source: StatsError,
    },
    #[error("no observations to merge")]
    EmptyInput,
}

impl MergeError {
    /// Whether this error stems from an observation that does not match the
    /// expected shape, as opposed to a statistic that lacks samples.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Json(_)
                | Self::MissingKey { .. }
                | Self::NotAnObject { .. }
                | Self::NotNumeric { .. }
                | Self::InvalidSimCount { .. }
                | Self::CountOverflow { .. }
        )
    }

    pub(crate) fn insufficient(statistic: String, source: StatsError) -> Self {
        Self::InsufficientSamples { statistic, source }
    }

    pub(crate) fn overflow(statistic: String, source: StatsError) -> Self {
        Self::CountOverflow { statistic, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_malformed_input() {
        let missing = MergeError::MissingKey {
            path: "features.config.numSims".to_string(),
        };
        assert!(missing.is_malformed());
        assert!(missing.to_string().contains("features.config.numSims"));

        let not_numeric = MergeError::NotNumeric {
            path: "features.surplus".to_string(),
            value: json!("lots"),
        };
        assert!(not_numeric.is_malformed());
        assert!(not_numeric.to_string().contains("\"lots\""));
    }

    #[test]
    fn insufficient_samples_is_not_malformed() {
        let err = MergeError::insufficient(
            "players.buyer.s1.egta_sample_stddev".to_string(),
            StatsError::TooFewSamples { count: 1 },
        );
        assert!(!err.is_malformed());
        assert!(!MergeError::EmptyInput.is_malformed());
        let message = err.to_string();
        assert!(message.contains("players.buyer.s1.egta_sample_stddev"));
        assert!(message.contains("got 1"));
    }

    #[test]
    fn count_overflow_is_malformed() {
        let err = MergeError::overflow(
            "players.buyer.s1.mean".to_string(),
            StatsError::CountOverflow {
                count: u64::MAX,
                added: 1,
            },
        );
        assert!(err.is_malformed());
        assert!(err.to_string().contains("players.buyer.s1.mean"));
    }
}
