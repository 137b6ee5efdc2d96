//! Runtime configuration.

use serde::{Deserialize, Serialize};
use stage_model::StageSize;

use crate::error::RuntimeError;

/// Tunables for the tick loop and interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Nominal tick period of the driving timer.
    pub tick_period_ms: u64,

    /// Stage size given to stages the runtime creates itself.
    pub stage_width: f64,
    pub stage_height: f64,

    /// Blocks all chains together may visit in one tick (or one `play` or
    /// click dispatch) before the remaining walks continue on the next tick.
    pub max_steps_per_tick: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 16,
            stage_width: 480.0,
            stage_height: 360.0,
            max_steps_per_tick: 10_000,
        }
    }
}

impl RuntimeConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the tick loop cannot run with.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.tick_period_ms == 0 {
            return Err(RuntimeError::InvalidConfig(
                "tick_period_ms must be at least 1".to_string(),
            ));
        }
        if self.max_steps_per_tick == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_steps_per_tick must be at least 1".to_string(),
            ));
        }
        if !(self.stage_width > 0.0 && self.stage_height > 0.0) {
            return Err(RuntimeError::InvalidConfig(format!(
                "stage size must be positive, got {}x{}",
                self.stage_width, self.stage_height
            )));
        }
        Ok(())
    }

    /// Stage size for stages the runtime creates.
    pub fn stage_size(&self) -> StageSize {
        StageSize {
            width: self.stage_width,
            height: self.stage_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str("max_steps_per_tick = 50\n").unwrap();
        assert_eq!(config.max_steps_per_tick, 50);
        assert_eq!(config.tick_period_ms, 16);
        assert_eq!(config.stage_size(), StageSize { width: 480.0, height: 360.0 });
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = RuntimeConfig::from_toml_str("tick_period_ms = 0").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));

        let err = RuntimeConfig::from_toml_str("stage_width = -1.0").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));

        let err = RuntimeConfig::from_toml_str("max_steps_per_tick = 0").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = RuntimeConfig::from_toml_str("tick_period_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigParse(_)));
    }
}
