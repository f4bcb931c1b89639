//! # Configuration System
//!
//! YAML configuration for polar code construction: block size, degrading
//! granularity, design channel, frozen-bit criterion, parallelism and
//! logging.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `POLARGRAPH_CONFIG` environment variable
//! 2. `./polargraph.yaml` (current directory)
//! 3. `~/.config/polargraph/config.yaml` (user config)
//! 4. `/etc/polargraph/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! n: 10
//! mu: 16
//! channel:
//!   type: bsc
//!   crossover: 0.11
//! selection:
//!   rate: 0.5
//! parallel: true
//! logging:
//!   level: info
//!   format: compact
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fec::polar_graph::MAX_STAGES;
use crate::fec::{BmsChannel, FrozenBitSelector, FrozenCriterion, PolarCode};
use crate::observe::LogConfig;
use crate::types::PolarResult;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "POLARGRAPH_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Design channel for frozen-bit selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    /// Binary symmetric channel
    Bsc { crossover: f64 },
    /// Binary erasure channel
    Bec { erasure: f64 },
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig::Bsc { crossover: 0.11 }
    }
}

impl ChannelConfig {
    pub fn build(&self) -> PolarResult<BmsChannel> {
        match *self {
            ChannelConfig::Bsc { crossover } => BmsChannel::bsc(crossover),
            ChannelConfig::Bec { erasure } => BmsChannel::bec(erasure),
        }
    }
}

/// Frozen-bit criterion. Exactly one field must be set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Freeze positions with error probability above this value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Target code rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            rate: Some(0.5),
        }
    }
}

impl SelectionConfig {
    pub fn criterion(&self) -> Result<FrozenCriterion, ConfigError> {
        FrozenCriterion::from_options(self.threshold, self.rate)
            .map_err(|e| ConfigError::ValidationError(format!("selection: {}", e)))
    }
}

/// Complete polar code construction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarConfig {
    /// Number of polarization stages; blocklength is `2^n`
    pub n: u32,
    /// Output alphabet bound for degrading merges (even, at least 2)
    pub mu: usize,
    /// Design channel
    pub channel: ChannelConfig,
    /// Frozen-bit criterion
    pub selection: SelectionConfig,
    /// Evaluate bit-channels on the rayon pool
    pub parallel: bool,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for PolarConfig {
    fn default() -> Self {
        Self {
            n: 10,
            mu: 16,
            channel: ChannelConfig::default(),
            selection: SelectionConfig::default(),
            parallel: true,
            logging: LogConfig::default(),
        }
    }
}

impl PolarConfig {
    /// Load configuration from the default search path.
    ///
    /// Returns the default configuration if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = Path::new(&path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points to {}",
                    CONFIG_ENV_VAR,
                    path.display()
                )));
            }
            return Self::load_from(path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Configuration files checked after the environment variable.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./polargraph.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "polargraph") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/polargraph/config.yaml"));
        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n > MAX_STAGES {
            return Err(ConfigError::ValidationError(format!(
                "n must be at most {}, got {}",
                MAX_STAGES, self.n
            )));
        }
        if self.mu < 2 || self.mu % 2 != 0 {
            return Err(ConfigError::ValidationError(format!(
                "mu must be even and at least 2, got {}",
                self.mu
            )));
        }
        let (name, p) = match self.channel {
            ChannelConfig::Bsc { crossover } => ("crossover", crossover),
            ChannelConfig::Bec { erasure } => ("erasure", erasure),
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::ValidationError(format!(
                "channel {} must lie in [0, 1], got {}",
                name, p
            )));
        }
        self.selection.criterion()?;
        Ok(())
    }

    /// Run frozen-bit selection and build the configured code.
    pub fn build_code(&self) -> PolarResult<PolarCode> {
        self.validate()?;
        let criterion = self.selection.criterion()?;
        let frozen = FrozenBitSelector::new(self.channel.build()?, self.n, self.mu)?
            .parallel(self.parallel)
            .select(criterion)?;
        PolarCode::new(self.n, frozen)
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            logging: LogConfig::production(),
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{LogFormat, LogLevel};
    use crate::types::PolarError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = PolarConfig::default();
        assert_eq!(config.n, 10);
        assert_eq!(config.mu, 16);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
n: 3
mu: 4
channel:
  type: bsc
  crossover: 0.1
selection:
  threshold: 0.1
parallel: false
logging:
  level: debug
  format: compact
"#;

        let config = PolarConfig::parse(yaml).unwrap();
        assert_eq!(config.n, 3);
        assert_eq!(config.channel, ChannelConfig::Bsc { crossover: 0.1 });
        assert_eq!(config.selection.threshold, Some(0.1));
        assert_eq!(config.selection.rate, None);
        assert!(!config.parallel);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = PolarConfig::parse("n: 4\nchannel:\n  type: bec\n  erasure: 0.5\n").unwrap();
        assert_eq!(config.n, 4);
        assert_eq!(config.channel, ChannelConfig::Bec { erasure: 0.5 });
        // defaults applied
        assert_eq!(config.mu, 16);
        assert_eq!(config.selection.rate, Some(0.5));
    }

    #[test]
    fn test_validation() {
        let mut config = PolarConfig::default();
        config.mu = 5;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.mu = 8;
        config.selection = SelectionConfig {
            threshold: Some(0.1),
            rate: Some(0.5),
        };
        assert!(config.validate().is_err());

        config.selection = SelectionConfig {
            threshold: None,
            rate: None,
        };
        assert!(config.validate().is_err());

        config.selection = SelectionConfig::default();
        config.channel = ChannelConfig::Bsc { crossover: 1.5 };
        assert!(config.validate().is_err());

        config.channel = ChannelConfig::default();
        config.n = MAX_STAGES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(matches!(
            PolarConfig::parse("mu: 3\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            PolarConfig::parse("n: [1, 2]\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_build_code() {
        let config = PolarConfig {
            n: 3,
            mu: 4,
            channel: ChannelConfig::Bsc { crossover: 0.1 },
            selection: SelectionConfig {
                threshold: Some(0.1),
                rate: None,
            },
            parallel: false,
            logging: LogConfig::quiet(),
        };
        let code = config.build_code().unwrap();
        assert_eq!(code.frozen(), &[0, 1, 2, 4]);
        assert_eq!(code.parity_check_matrix().num_rows(), 4);
        assert_eq!(code.parity_check_matrix().num_cols(), 8);
    }

    #[test]
    fn test_build_code_reports_config_error() {
        let config = PolarConfig {
            mu: 0,
            ..Default::default()
        };
        assert!(matches!(config.build_code(), Err(PolarError::Config(_))));
    }

    #[test]
    fn test_example_yaml() {
        let yaml = PolarConfig::example_yaml();
        assert!(yaml.contains("selection:"));
        assert!(yaml.contains("type: bsc"));
        let parsed = PolarConfig::parse(&yaml).unwrap();
        assert_eq!(parsed.logging, LogConfig::production());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("polargraph.yaml");
        let config = PolarConfig {
            n: 5,
            channel: ChannelConfig::Bec { erasure: 0.3 },
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = PolarConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolarConfig::load_from(Path::new("/nonexistent/polargraph.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = PolarConfig::config_search_paths();
        assert!(paths[0].ends_with("polargraph.yaml"));
        assert!(paths.last().unwrap().ends_with("config.yaml"));
    }
}
