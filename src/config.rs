//! # Configuration
//!
//! Layered configuration for the capacity and waitlist core, loaded with the
//! `config` crate in this order (later layers win):
//!
//! 1. Built-in defaults ([`VolunteerConfig::default`])
//! 2. Optional TOML file (explicit path, or `VOLUNTEER_CONFIG_PATH`)
//! 3. Environment variables prefixed `VOLUNTEER_`, nested with `__`
//!    (e.g. `VOLUNTEER_WAITLIST__ACCEPTANCE_WINDOW_HOURS=12`)
//!
//! ```rust,no_run
//! use volunteer_core::config::VolunteerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VolunteerConfig::load()?;
//! let window = config.acceptance_window();
//! # Ok(())
//! # }
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::system;
use crate::error::{Result, VolunteerError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolunteerConfig {
    pub waitlist: WaitlistConfig,
    pub notifications: NotificationConfig,
    pub events: EventChannelConfig,
    pub database: DatabaseConfig,
}

/// Acceptance window and expiry sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitlistConfig {
    pub acceptance_window_hours: u32,
    pub sweep_interval_seconds: u64,
    pub sweep_enabled: bool,
    /// Drop idle per-event locks after each sweep cycle
    pub lock_prune_on_sweep: bool,
}

impl Default for WaitlistConfig {
    fn default() -> Self {
        Self {
            acceptance_window_hours: system::ACCEPTANCE_WINDOW_HOURS,
            sweep_interval_seconds: system::DEFAULT_SWEEP_INTERVAL_SECONDS,
            sweep_enabled: true,
            lock_prune_on_sweep: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Upper bound on a single gateway call
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: system::DEFAULT_NOTIFICATION_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventChannelConfig {
    pub channel_capacity: usize,
}

impl Default for EventChannelConfig {
    fn default() -> Self {
        Self {
            channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/volunteer_core_development".to_string(),
            max_connections: 10,
        }
    }
}

impl VolunteerConfig {
    /// Load from defaults, `VOLUNTEER_CONFIG_PATH` (if set) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("VOLUNTEER_CONFIG_PATH").ok();
        Self::load_layers(path.as_deref().map(Path::new), true)
    }

    /// Load from defaults and a required TOML file, ignoring the environment
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(Some(path.as_ref()), false)
    }

    fn load_layers(path: Option<&Path>, with_env: bool) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        if with_env {
            builder = builder.add_source(
                Environment::with_prefix("VOLUNTEER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            acceptance_window_hours = config.waitlist.acceptance_window_hours,
            sweep_interval_seconds = config.waitlist.sweep_interval_seconds,
            sweep_enabled = config.waitlist.sweep_enabled,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.waitlist.acceptance_window_hours == 0 {
            return Err(VolunteerError::ConfigurationError(
                "waitlist.acceptance_window_hours must be positive".to_string(),
            ));
        }
        if self.waitlist.sweep_interval_seconds == 0 {
            return Err(VolunteerError::ConfigurationError(
                "waitlist.sweep_interval_seconds must be positive".to_string(),
            ));
        }
        if self.notifications.timeout_ms == 0 {
            return Err(VolunteerError::ConfigurationError(
                "notifications.timeout_ms must be positive".to_string(),
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(VolunteerError::ConfigurationError(
                "events.channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acceptance_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.waitlist.acceptance_window_hours))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.waitlist.sweep_interval_seconds)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notifications.timeout_ms)
    }
}
