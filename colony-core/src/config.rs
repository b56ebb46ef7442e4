use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, types::Generation};

/// Immutable growth parameters shared by the engine, batcher and channel.
///
/// Missing fields take their [`Default`] values when deserialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Minimum number of same-medium neighbors alive in the previous
    /// generation for a candidate to activate. Must be at least 1.
    pub threshold: usize,
    /// Number of lifetime steps a cell passes through once activated.
    pub lifetime: usize,
    /// Accumulated changes that trigger a flush at the end of a generation.
    ///
    /// This is a trigger, not a cap: a generation's writes are never split,
    /// so one batch may hold more snapshots than this.
    pub batch_size: usize,
    /// Added to every banded seed generation.
    pub band_offset: Generation,
    pub command_capacity: usize,
    pub response_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 2,
            lifetime: 24,
            batch_size: 3000,
            band_offset: 0,
            command_capacity: 1024,
            response_capacity: 64,
        }
    }
}

impl Config {
    /// Parses a JSON config and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Config =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values that would make the simulation meaningless or stall it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.lifetime == 0 {
            return Err(ConfigError::ZeroLifetime);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("command_capacity"));
        }
        if self.response_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("response_capacity"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.threshold, 2);
        assert_eq!(cfg.batch_size, 3000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let cfg = Config {
            lifetime: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroLifetime));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let cfg = Config {
            threshold: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroThreshold));
        assert_eq!(
            Config::from_json_str(r#"{"threshold": 0}"#),
            Err(ConfigError::ZeroThreshold)
        );
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let cfg = Config {
            response_capacity: 0,
            ..Config::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroCapacity("response_capacity"))
        );
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let cfg = Config::from_json_str(r#"{"threshold": 3, "lifetime": 16}"#).unwrap();
        assert_eq!(cfg.threshold, 3);
        assert_eq!(cfg.lifetime, 16);
        assert_eq!(cfg.batch_size, Config::default().batch_size);
    }

    #[test]
    fn from_json_validates() {
        let err = Config::from_json_str(r#"{"lifetime": 0}"#).unwrap_err();
        assert_eq!(err, ConfigError::ZeroLifetime);

        let err = Config::from_json_str("not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
