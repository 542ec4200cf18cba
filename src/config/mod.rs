//! Application configuration module
//!
//! Configuration is loaded from environment variables using the `config` and
//! `dotenvy` crates. Variables carry the `TELEMETRY_RELAY` prefix and nested
//! values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use telemetry_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Relay listening on {}", config.http.bind);
//! ```

mod error;
mod http;
mod monitor;
mod upstream;

pub use error::{ConfigError, ValidationError};
pub use http::{HttpConfig, MAX_VIEWER_BUFFER};
pub use monitor::{MonitorConfig, DOMAINS_ENV_VAR};
pub use upstream::{UpstreamConfig, UpstreamSource};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// relay. Load using [`AppConfig::load()`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Viewer endpoint, per-viewer queues and log output
    pub http: HttpConfig,

    /// Upstream record stream read by `serve`
    pub upstream: UpstreamConfig,

    /// Aggregator settings for `monitor`
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `TELEMETRY_RELAY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `TELEMETRY_RELAY__HTTP__BIND=127.0.0.1:8080` -> `http.bind`
    /// - `TELEMETRY_RELAY__UPSTREAM__SOURCE=stdin` -> `upstream.source = stdin`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TELEMETRY_RELAY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.http.validate()?;
        self.upstream.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}
