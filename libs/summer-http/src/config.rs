//! Server configuration.
//!
//! Values are layered with `figment`: built-in defaults, then an optional YAML
//! file, then `SUMMER_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `SUMMER_LOGGING__LEVEL=debug`).
//!
//! Programmatic overrides go through [`ConfigOverlay`], whose fields are all
//! optional: a field left `None` keeps the current value, while `Some(false)`
//! or `Some(vec![])` explicitly overrides it.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "SUMMER_";

/// Configuration error for loading and merging settings
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file '{}' not found", path.display())]
    FileNotFound { path: PathBuf },
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or `"*"` to admit any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TracingConfig {
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "summer".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SummerConfig {
    /// Enables body capture in traces and frame echo on recovered panics.
    pub debug: bool,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub tracing: TracingConfig,
}

/// Explicit overrides; only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigOverlay {
    pub debug: Option<bool>,
    pub allowed_origins: Option<Vec<String>>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
    pub service_name: Option<String>,
}

impl SummerConfig {
    /// Load defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::FileNotFound`] when `path` is given but missing, and
    /// [`ConfigError::Invalid`] when a layer cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SummerConfig::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }
        Self::from_figment(&figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] when the figment does not describe a valid config.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Apply every field the overlay sets, including explicit `false` and empty values.
    pub fn merge(&mut self, overlay: ConfigOverlay) {
        let ConfigOverlay {
            debug,
            allowed_origins,
            log_level,
            log_json,
            service_name,
        } = overlay;

        if let Some(debug) = debug {
            self.debug = debug;
        }
        if let Some(origins) = allowed_origins {
            self.cors.allowed_origins = origins;
        }
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        if let Some(json) = log_json {
            self.logging.json = json;
        }
        if let Some(name) = service_name {
            self.tracing.service_name = name;
        }
    }

    #[must_use]
    pub fn merged(mut self, overlay: ConfigOverlay) -> Self {
        self.merge(overlay);
        self
    }
}
