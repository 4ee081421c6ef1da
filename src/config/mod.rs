//! Server configuration.
//!
//! Configuration is read from an optional TOML file and overridden by
//! environment variables prefixed with `INTERBASE`, using `__` between
//! nested keys (for example `INTERBASE__INSTRUMENTATION__SLOW_CALL_MS=250`).

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::logging::{LogLevel, LoggingConfig};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "INTERBASE";

/// Identity reported to MCP clients.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSection {
    /// Server name returned during initialization
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Optional instructions for clients
    #[serde(default)]
    pub instructions: Option<String>,
}

fn default_server_name() -> String {
    "interbase".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            instructions: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LoggingSection {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig::new()
            .with_level(self.level)
            .with_timestamps(self.timestamps)
    }
}

/// Settings for the instrumentation stage.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstrumentationSection {
    /// Warn about calls slower than this many milliseconds
    #[serde(default)]
    pub slow_call_ms: Option<u64>,
    /// Expose the built-in `tool_metrics` tool
    #[serde(default = "default_true")]
    pub metrics_tool: bool,
}

impl Default for InstrumentationSection {
    fn default() -> Self {
        Self {
            slow_call_ms: None,
            metrics_tool: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub instrumentation: InstrumentationSection,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] config::ConfigError),

    /// The path is not valid UTF-8.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),
}

impl ServerConfig {
    /// Load configuration from `path` (if given) plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `path` is given but does not exist
    /// - the file or the environment overrides cannot be parsed
    /// - the path is not valid UTF-8
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use interbase::config::ServerConfig;
    ///
    /// let config = ServerConfig::load(Some("interbase.toml"))?;
    /// # Ok::<(), interbase::config::ConfigError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path = path.as_ref();
            let path_str = path
                .to_str()
                .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path_str.to_string()));
            }
            builder = builder.add_source(File::with_name(path_str));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        tracing::debug!(?server_config, "loaded configuration");
        Ok(server_config)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml_str, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.name, "interbase");
        assert!(config.server.instructions.is_none());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.logging.timestamps);
        assert_eq!(config.instrumentation.slow_call_ms, None);
        assert!(config.instrumentation.metrics_tool);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let toml_str = r#"
            [server]
            name = "interlock"
            instructions = "File reservation tools"

            [logging]
            level = "debug"
            timestamps = false

            [instrumentation]
            slow_call_ms = 250
            metrics_tool = false
        "#;

        let config = ServerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.name, "interlock");
        assert_eq!(
            config.server.instructions.as_deref(),
            Some("File reservation tools")
        );
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(!config.logging.timestamps);
        assert_eq!(config.instrumentation.slow_call_ms, Some(250));
        assert!(!config.instrumentation.metrics_tool);
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let config = ServerConfig::from_toml_str("[logging]\nlevel = \"DEBUG\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);

        let config = ServerConfig::from_toml_str("[logging]\nlevel = \"warning\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let result = ServerConfig::from_toml_str("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServerConfig::load(Some("/nonexistent/interbase.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[server]\nname = \"from-file\"").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.name, "from-file");
        assert!(config.instrumentation.metrics_tool);
    }

    #[test]
    fn test_logging_section_to_logging_config() {
        let section = LoggingSection {
            level: LogLevel::Warn,
            timestamps: false,
        };
        let logging = section.to_logging_config();
        assert_eq!(logging.level, LogLevel::Warn);
        assert!(!logging.with_timestamps);
    }
}
