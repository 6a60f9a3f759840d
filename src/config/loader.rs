//! Configuration Loader
//!
//! Environment-aware configuration loading. Discovers YAML files under the
//! config directory, merges environment-specific overrides on top of the
//! base file, then applies `OFFERFLOW_`-prefixed environment variables.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use config::{Config, Environment, File};
use tracing::debug;

use super::OfferflowConfig;
use crate::error::{Result, WorkflowError};

/// Loaded configuration plus the context it was resolved in
pub struct ConfigManager {
    config: OfferflowConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit
    /// environment. Useful for tests, which must not mutate process-wide
    /// environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let base_file = config_directory.join("offerflow");
        let env_file = config_directory.join("offerflow").join(environment);

        let raw = Config::builder()
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                Environment::with_prefix("OFFERFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| {
                WorkflowError::configuration(format!("failed to read configuration: {e}"))
            })?;

        let mut config: OfferflowConfig = raw.try_deserialize().map_err(|e| {
            WorkflowError::configuration(format!("failed to parse configuration: {e}"))
        })?;

        // DATABASE_URL wins over the structured database section
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database.url = Some(url);
            }
        }

        config.validate()?;

        debug!(
            environment = environment,
            database_host = %config.database.host,
            pool_size = config.database.pool,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &OfferflowConfig {
        &self.config
    }

    /// Environment this configuration was resolved for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Directory the configuration was loaded from
    pub fn config_directory(&self) -> &PathBuf {
        &self.config_directory
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_test(&self) -> bool {
        self.environment == "test"
    }

    /// Connection string resolved from the database section
    pub fn database_url(&self) -> String {
        self.config.database.connection_url()
    }

    /// Detect current environment from environment variables:
    /// OFFERFLOW_ENV || APP_ENV || RUST_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("OFFERFLOW_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .or_else(|_| env::var("RUST_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("OFFERFLOW_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("environment", &self.environment)
            .field("config_directory", &self.config_directory)
            .finish()
    }
}
