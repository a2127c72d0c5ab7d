//! Logger configuration
//!
//! `LoggerConfig` is the whole configuration surface: level threshold,
//! formatting switches, default context, which transports are enabled and
//! their parameters. It deserializes from TOML or JSON (camelCase keys) and
//! every field has a default, so partial files are fine.

use super::error::{LoggerError, Result};
use super::log_context::LogContext;
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deployment environment tag
///
/// Passed explicitly into logger construction; the core never looks at
/// process environment variables on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
    Custom(String),
}

impl Environment {
    pub fn as_str(&self) -> &str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
            Environment::Custom(name) => name,
        }
    }

    /// Map common spellings (`prod`, `dev`, ...) onto the known variants
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Environment::Development,
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            other => Environment::Custom(other.to_string()),
        }
    }

    /// Read the environment name from a process variable such as `APP_ENV`
    ///
    /// This is an explicit opt-in for binaries; library code should pass the
    /// `Environment` it was given.
    pub fn from_env_var(var: &str) -> Option<Self> {
        std::env::var(var).ok().map(|v| Self::from_name(&v))
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Environment::from_name(&value)
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.as_str().to_string()
    }
}

/// Which side of the wire a logger runs on; selects the transport set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentTarget {
    /// Console + remote shipping; never writes local files
    Client,
    /// Console + rotating file + optional remote shipping
    Server,
}

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggerConfig {
    /// Minimum level that reaches the transports
    pub level: LogLevel,
    /// Show timestamps in human-readable console output
    pub timestamp: bool,
    pub colorize: bool,
    /// JSON lines on the console instead of the human format
    pub structured: bool,
    pub environment: Environment,
    pub default_context: LogContext,

    pub enable_console: bool,
    pub enable_file: bool,
    pub enable_remote: bool,

    pub remote_endpoint: Option<String>,
    pub batch_size: usize,
    /// Milliseconds between timer-driven flushes
    pub flush_interval: u64,
    pub max_retries: u32,
    /// Per-request timeout for remote delivery, in milliseconds
    pub remote_timeout: u64,
    /// Static labels sent with every remote batch
    pub labels: BTreeMap<String, String>,

    pub file_path: PathBuf,
    /// Size threshold such as `"20m"`, `"512k"` or a plain byte count
    pub max_size: String,
    pub max_files: usize,
    /// `YYYY-MM-DD` rotates daily, `YYYY-MM-DD-HH` hourly
    pub date_pattern: String,
    pub zipped_archive: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            timestamp: true,
            colorize: true,
            structured: false,
            environment: Environment::Development,
            default_context: LogContext::new(),
            enable_console: true,
            enable_file: false,
            enable_remote: false,
            remote_endpoint: None,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT_MS,
            labels: BTreeMap::new(),
            file_path: PathBuf::from("logs/app.log"),
            max_size: "20m".to_string(),
            max_files: 14,
            date_pattern: "YYYY-MM-DD".to_string(),
            zipped_archive: true,
        }
    }
}

impl LoggerConfig {
    /// Defaults tuned for an environment
    ///
    /// Production logs JSON at info without colors; development logs
    /// human-readable colored output at debug; tests only show warnings.
    pub fn for_environment(environment: Environment) -> Self {
        let base = Self::default();
        match environment {
            Environment::Production => Self {
                level: LogLevel::Info,
                structured: true,
                colorize: false,
                environment,
                ..base
            },
            Environment::Development => Self {
                level: LogLevel::Debug,
                structured: false,
                colorize: true,
                environment,
                ..base
            },
            Environment::Test => Self {
                level: LogLevel::Warn,
                structured: false,
                colorize: false,
                environment,
                ..base
            },
            Environment::Custom(_) => Self { environment, ..base },
        }
    }

    /// Load a configuration file, choosing the parser from the extension
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logger config",
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)
                .map_err(|e| LoggerError::config_parse(path.display().to_string(), e.to_string()))?,
            _ => Self::from_toml_str(&content)
                .map_err(|e| LoggerError::config_parse(path.display().to_string(), e.to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LoggerError::config_parse("<toml>", e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check the options that can make a transport unusable
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoggerError::config("RemoteTransport", "batchSize must be at least 1"));
        }
        if self.flush_interval == 0 {
            return Err(LoggerError::config("RemoteTransport", "flushInterval must be positive"));
        }
        if self.enable_remote {
            let endpoint = self.remote_endpoint.as_deref().unwrap_or_default();
            if endpoint.trim().is_empty() {
                return Err(LoggerError::config(
                    "RemoteTransport",
                    "enableRemote is set but remoteEndpoint is missing",
                ));
            }
            reqwest::Url::parse(endpoint).map_err(|e| {
                LoggerError::config("RemoteTransport", format!("invalid remoteEndpoint '{}': {}", endpoint, e))
            })?;
        }
        if self.enable_file {
            parse_size(&self.max_size)?;
            if self.max_files == 0 {
                return Err(LoggerError::config("FileTransport", "maxFiles must be at least 1"));
            }
        }
        Ok(())
    }

    pub fn flush_interval_duration(&self) -> Duration {
        Duration::from_millis(self.flush_interval)
    }

    pub fn remote_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.remote_timeout)
    }

    /// `max_size` in bytes
    pub fn max_size_bytes(&self) -> Result<u64> {
        parse_size(&self.max_size)
    }
}

/// Parse sizes like `"20m"`, `"512k"`, `"1g"` or `"1048576"` into bytes
pub fn parse_size(value: &str) -> Result<u64> {
    let trimmed = value.trim().to_lowercase();
    let trimmed = trimmed.strip_suffix('b').unwrap_or(&trimmed);
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('k') => (&trimmed[..trimmed.len() - 1], 1024),
        Some('m') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some('g') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n * multiplier)
        .ok_or_else(|| LoggerError::config("FileTransport", format!("invalid maxSize '{}'", value)))
}
