//! Configuration loading and typed config structures for the moisture
//! simulator.
//!
//! The configuration lives in `moisture-config.yaml` at the project root.
//! Every field has a default, so a missing or empty file yields a working
//! setup. A handful of environment variables override the file so container
//! deployments can tune the process without editing YAML.
//!
//! Configuration is resolved once at startup and never changes afterwards.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its accepted range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulator configuration. Mirrors `moisture-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulatorConfig {
    /// Tick timing, history bound, and startup seeding.
    #[serde(default)]
    pub simulation: SimulationSettings,

    /// HTTP/WebSocket listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulatorConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// Recognized variables: `TICK_SECONDS`, `MAX_HISTORY`,
    /// `CORS_ALLOW_ORIGINS` (comma separated), and `OBSERVER_PORT`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults. Env
    /// overrides and validation apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TICK_SECONDS") {
            self.simulation.tick_seconds = parse_env("TICK_SECONDS", &val)?;
        }
        if let Some(val) = lookup("MAX_HISTORY") {
            self.simulation.max_history = parse_env("MAX_HISTORY", &val)?;
        }
        if let Some(val) = lookup("CORS_ALLOW_ORIGINS") {
            self.server.cors_allow_origins = val
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(val) = lookup("OBSERVER_PORT") {
            self.server.port = parse_env("OBSERVER_PORT", &val)?;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tick = self.simulation.tick_seconds;
        if !tick.is_finite() || tick <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!("simulation.tick_seconds must be a positive number, got {tick}"),
            });
        }
        if self.simulation.max_history == 0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.max_history must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, val: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    val.trim().parse().map_err(|e| ConfigError::Invalid {
        reason: format!("{key} is not a valid value: {val:?} ({e})"),
    })
}

/// Simulation timing and store sizing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSettings {
    /// Seconds between ticks; also the physics `dt`.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,

    /// Maximum readings kept per device.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Create the example devices when the store starts empty.
    #[serde(default = "default_true")]
    pub seed_examples: bool,

    /// Fixed seed for fault noise. Random when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl SimulationSettings {
    /// The tick interval as a [`Duration`](std::time::Duration).
    ///
    /// Only meaningful after [`SimulatorConfig::validate`] has accepted the
    /// value; anything unrepresentable falls back to one second.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.tick_seconds)
            .unwrap_or(std::time::Duration::from_secs(1))
    }

    /// Clamp a requested history length into `[1, max_history]`.
    pub fn clamp_history_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_history.max(1))
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            max_history: default_max_history(),
            seed_examples: true,
            rng_seed: None,
        }
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. `*` allows any origin.
    #[serde(default = "default_cors_allow_origins")]
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allow_origins: default_cors_allow_origins(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tick_seconds() -> f64 {
    1.0
}

const fn default_max_history() -> usize {
    2000
}

const fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8001
}

fn default_cors_allow_origins() -> Vec<String> {
    vec!["*".to_owned()]
}

fn default_log_level() -> String {
    "info".to_owned()
}
