//! Configuration schema (ibisgate.toml)

use serde::{Deserialize, Serialize};

/// Input threshold defaults used when a threshold-required model omits one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDefaults {
    /// Default low input threshold, in volts
    #[serde(default = "ThresholdDefaults::default_vinl")]
    pub default_vinl: f64,

    /// Default high input threshold, in volts
    #[serde(default = "ThresholdDefaults::default_vinh")]
    pub default_vinh: f64,
}

impl ThresholdDefaults {
    pub const VINL: f64 = 0.8;
    pub const VINH: f64 = 2.0;

    fn default_vinl() -> f64 {
        Self::VINL
    }

    fn default_vinh() -> f64 {
        Self::VINH
    }
}

impl Default for ThresholdDefaults {
    fn default() -> Self {
        Self {
            default_vinl: Self::VINL,
            default_vinh: Self::VINH,
        }
    }
}

/// How a pull table the model type must not drive is normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionEncoding {
    /// Keep the table and zero its currents
    #[default]
    Zero,

    /// Remove the table
    Omit,
}

/// Pipeline execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Process batches on the rayon thread pool
    #[serde(default = "PipelineConfig::default_parallel")]
    pub parallel: bool,

    /// Normalized form of suppressed pull tables
    #[serde(default)]
    pub suppressed_sections: SuppressionEncoding,
}

impl PipelineConfig {
    fn default_parallel() -> bool {
        true
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            suppressed_sections: SuppressionEncoding::Zero,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Threshold defaults
    #[serde(default)]
    pub thresholds: ThresholdDefaults,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.check()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    fn check(&self) -> Result<(), ConfigError> {
        let ThresholdDefaults { default_vinl, default_vinh } = self.thresholds;
        if !default_vinl.is_finite() || !default_vinh.is_finite() || default_vinl >= default_vinh {
            return Err(ConfigError::InvalidValue(format!(
                "thresholds.default_vinl ({}) must be below thresholds.default_vinh ({})",
                default_vinl, default_vinh
            )));
        }
        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
