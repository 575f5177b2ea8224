//! Configuration loading.
//!
//! [`DatabaseConfig::load`] reads `config/config.toml` (section `[database]`)
//! and lets `TABLEKIT_DATABASE__*` environment variables override it.

use crate::connection::IsolationLevel;
use crate::dialect::Dialect;
use crate::error::DataError;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::str::FromStr;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "TABLEKIT";

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default = "default_isolation_level")]
    pub isolation_level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            dialect: default_dialect(),
            isolation_level: default_isolation_level(),
        }
    }
}

fn default_db_url() -> String {
    "tablekit.db".to_string()
}

fn default_dialect() -> String {
    "sqlite".to_string()
}

fn default_isolation_level() -> String {
    "read_committed".to_string()
}

impl DatabaseConfig {
    /// Load the database configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Deserialize the `database` section of an already built [`Config`].
    ///
    /// A missing section yields the defaults.
    pub fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<DatabaseConfig>("database") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }

    /// The configured dialect, rejecting names outside the supported set.
    pub fn dialect(&self) -> Result<Dialect, DataError> {
        Dialect::from_str(&self.dialect)
    }

    /// The default isolation level for units of work.
    pub fn isolation_level(&self) -> Result<IsolationLevel, DataError> {
        IsolationLevel::from_str(&self.isolation_level)
    }
}
