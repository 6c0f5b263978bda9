//! Simulator configuration
//!
//! Delay range and success probability are parameters so tests can pin them.
//! Configuration can come from code (builder methods) or a TOML file:
//!
//! ```toml
//! success_probability = 0.9
//!
//! [delay]
//! min_ms = 1000
//! max_ms = 3000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default lower delay bound
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;
/// Default upper delay bound
pub const DEFAULT_MAX_DELAY_MS: u64 = 3000;
/// Default success probability
pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.90;

/// Inclusive completion delay range, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayRange {
    /// Shortest delay
    pub min_ms: u64,
    /// Longest delay
    pub max_ms: u64,
}

impl DelayRange {
    /// Range containing exactly one value
    #[inline]
    #[must_use]
    pub fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }

    /// Whether `ms` lies inside the range
    #[inline]
    #[must_use]
    pub fn contains(&self, ms: u64) -> bool {
        (self.min_ms..=self.max_ms).contains(&ms)
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_MIN_DELAY_MS,
            max_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// Single-flight simulator configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Completion delay, drawn uniformly per accepted operation
    pub delay: DelayRange,
    /// Probability that a completed operation succeeds
    pub success_probability: f64,
}

impl SimulatorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With delay range (inclusive, milliseconds)
    #[inline]
    #[must_use]
    pub fn with_delay_range(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.delay = DelayRange { min_ms, max_ms };
        self
    }

    /// With a single fixed delay
    #[inline]
    #[must_use]
    pub fn with_fixed_delay(mut self, ms: u64) -> Self {
        self.delay = DelayRange::fixed(ms);
        self
    }

    /// With success probability
    #[inline]
    #[must_use]
    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.success_probability = probability;
        self
    }

    /// Check bounds
    ///
    /// # Errors
    /// - `ConfigError::InvalidDelayRange` if `min_ms > max_ms`
    /// - `ConfigError::InvalidProbability` if the probability is not a finite
    ///   value in `[0, 1]`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay.min_ms > self.delay.max_ms {
            return Err(ConfigError::InvalidDelayRange {
                min_ms: self.delay.min_ms,
                max_ms: self.delay.max_ms,
            });
        }
        if !self.success_probability.is_finite()
            || !(0.0..=1.0).contains(&self.success_probability)
        {
            return Err(ConfigError::InvalidProbability(self.success_probability));
        }
        Ok(())
    }

    /// Parse and validate a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML
    /// - any error from [`validate`](Self::validate)
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - any error from [`from_toml_str`](Self::from_toml_str)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            delay: DelayRange::default(),
            success_probability: DEFAULT_SUCCESS_PROBABILITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_page() {
        let config = SimulatorConfig::default();
        assert_eq!(config.delay, DelayRange { min_ms: 1000, max_ms: 3000 });
        assert!((config.success_probability - 0.90).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let config = SimulatorConfig::new().with_delay_range(3000, 1000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDelayRange { min_ms: 3000, max_ms: 1000 })
        ));
    }

    #[test]
    fn rejects_bad_probability() {
        for p in [-0.1, 1.01, f64::NAN, f64::INFINITY] {
            let config = SimulatorConfig::new().with_success_probability(p);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidProbability(_))));
        }
        assert!(SimulatorConfig::new().with_success_probability(0.0).validate().is_ok());
        assert!(SimulatorConfig::new().with_success_probability(1.0).validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str("[delay]\nmax_ms = 5000\n").unwrap();
        assert_eq!(config.delay, DelayRange { min_ms: 1000, max_ms: 5000 });
        assert!((config.success_probability - 0.90).abs() < f64::EPSILON);
    }

    #[test]
    fn toml_is_validated() {
        let err = SimulatorConfig::from_toml_str("success_probability = 2.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProbability(_)));

        let err = SimulatorConfig::from_toml_str("delay = 7").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
