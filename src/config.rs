//! Configuration for a calibration run.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DEPTH, DEFAULT_SPACING, DEFAULT_TRIALS, MAX_CYCLES, MIN_SPACING,
};

/// Configuration options for `Calibrator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Branch-predictor training depth (default: 9).
    ///
    /// Each trial runs `2 * depth + 2` invocations. Cores need somewhere
    /// between 2 and 9 consistent outcomes before a probe mispredicts.
    pub depth: usize,

    /// Number of trials (default: 1,000,000). Each trial yields one sample
    /// per probe class.
    pub trials: usize,

    /// Busy-wait iterations before each invocation (default: 16, must be > 13).
    pub spacing: usize,

    /// Histogram buckets per class (default: 1024).
    pub max_cycles: usize,

    /// Collect percentile/histogram diagnostics (default: true).
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            trials: DEFAULT_TRIALS,
            spacing: DEFAULT_SPACING,
            max_cycles: MAX_CYCLES,
            debug: true,
        }
    }
}

impl Config {
    /// Reduced trial count for tests and smoke runs.
    pub fn quick() -> Self {
        Self {
            trials: 20_000,
            ..Self::default()
        }
    }

    /// Length of the training sequence for this depth.
    pub fn sequence_len(&self) -> usize {
        2 * self.depth + 2
    }

    /// Check the configuration for values the trial loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.spacing <= MIN_SPACING {
            return Err(ConfigError::SpacingTooShort {
                spacing: self.spacing,
                minimum: MIN_SPACING + 1,
            });
        }
        if self.max_cycles == 0 {
            return Err(ConfigError::EmptyHistogram);
        }
        Ok(())
    }
}

/// Error returned by [`Config::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `depth` must be at least 1.
    ZeroDepth,
    /// The busy-wait is too short to break up adjacent-call locality.
    SpacingTooShort {
        /// Requested spacing.
        spacing: usize,
        /// Smallest accepted value.
        minimum: usize,
    },
    /// `max_cycles` must be at least 1.
    EmptyHistogram,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDepth => write!(f, "branch training depth must be at least 1"),
            Self::SpacingTooShort { spacing, minimum } => write!(
                f,
                "spacing of {} iterations is too short (minimum {})",
                spacing, minimum
            ),
            Self::EmptyHistogram => write!(f, "histogram needs at least one bucket"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.depth, 9);
        assert_eq!(config.trials, 1_000_000);
        assert_eq!(config.sequence_len(), 20);
        assert!(config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_depth() {
        let config = Config {
            depth: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDepth));
    }

    #[test]
    fn test_rejects_short_spacing() {
        let config = Config {
            spacing: 13,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::SpacingTooShort {
                spacing: 13,
                minimum: 14
            }
        );
        assert!(err.to_string().contains("13"));
    }

    #[test]
    fn test_zero_trials_is_valid() {
        let config = Config {
            trials: 0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
