//! # Configuration System
//!
//! Typed, layered configuration for the workflow engine and aggregator.
//! Values load from `config/offerflow.yaml`, merged with
//! `config/offerflow/{environment}.yaml` overrides and `OFFERFLOW_`-prefixed
//! environment variables. Every section carries defaults so the crate runs
//! with no config files at all.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offerflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let threshold = manager.config().workflow.thresholds.tecnico_hours;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};
use crate::state_machine::states::Department;

pub use loader::ConfigManager;

/// Root configuration for the crate
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OfferflowConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Database connection settings. `DATABASE_URL` wins over the structured
/// fields when set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub pool: u32,
    pub checkout_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            database: "offerflow_development".to_string(),
            pool: 10,
            checkout_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Connection string, preferring an explicit `url` override
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// Workflow engine settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub thresholds: BottleneckThresholds,
    /// Default threshold for bottleneck alert scans when the caller
    /// supplies none
    pub default_alert_threshold_hours: f64,
    /// Broadcast channel capacity for change events
    pub event_channel_capacity: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            thresholds: BottleneckThresholds::default(),
            default_alert_threshold_hours: 24.0,
            event_channel_capacity: 1000,
        }
    }
}

/// Per-department in-progress duration limits, in hours. A step whose
/// elapsed time exceeds its department's limit is flagged as a bottleneck.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BottleneckThresholds {
    pub commerciale_hours: f64,
    pub fattibilita_hours: f64,
    pub tecnico_hours: f64,
    pub acquisti_hours: f64,
    pub pianificazione_hours: f64,
}

impl Default for BottleneckThresholds {
    fn default() -> Self {
        Self {
            commerciale_hours: 8.0,
            fattibilita_hours: 48.0,
            tecnico_hours: 48.0,
            acquisti_hours: 24.0,
            pianificazione_hours: 24.0,
        }
    }
}

impl BottleneckThresholds {
    /// Threshold for one department, in hours
    pub fn for_department(&self, department: Department) -> f64 {
        match department {
            Department::Commerciale => self.commerciale_hours,
            Department::Fattibilita => self.fattibilita_hours,
            Department::Tecnico => self.tecnico_hours,
            Department::Acquisti => self.acquisti_hours,
            Department::Pianificazione => self.pianificazione_hours,
        }
    }

    /// Threshold for one department, in whole minutes
    pub fn minutes_for_department(&self, department: Department) -> i64 {
        (self.for_department(department) * 60.0).round() as i64
    }
}

/// Metrics aggregator settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Maximum rows returned by the client ranking
    pub ranking_limit: i64,
    /// Offers-per-year count above which the loyalty volume bonus applies
    pub loyalty_volume_threshold: i64,
    /// Multiplier applied to the raw loyalty score over the threshold
    pub loyalty_volume_bonus: f64,
    /// Processing-time samples outside (0, cap) hours are clock artifacts
    /// and are dropped from averages
    pub processing_time_cap_hours: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            ranking_limit: 50,
            loyalty_volume_threshold: 20,
            loyalty_volume_bonus: 1.1,
            processing_time_cap_hours: 720.0,
        }
    }
}

impl OfferflowConfig {
    /// Validate the loaded configuration, rejecting values that would make
    /// the engine misbehave silently.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_none() && self.database.host.is_empty() {
            return Err(WorkflowError::configuration(
                "database.host must not be empty when database.url is unset",
            ));
        }

        if self.database.pool == 0 {
            return Err(WorkflowError::configuration(
                "database.pool must be greater than 0",
            ));
        }

        for department in Department::ALL {
            if self.workflow.thresholds.for_department(department) <= 0.0 {
                return Err(WorkflowError::configuration(format!(
                    "workflow threshold for {department} must be positive"
                )));
            }
        }

        if self.analytics.ranking_limit <= 0 {
            return Err(WorkflowError::configuration(
                "analytics.ranking_limit must be positive",
            ));
        }

        if self.analytics.loyalty_volume_bonus < 1.0 {
            return Err(WorkflowError::configuration(
                "analytics.loyalty_volume_bonus must be at least 1.0",
            ));
        }

        Ok(())
    }
}
