//! # nosa configuration
//!
//! Layered configuration for the capture engine and its transport.
//!
//! Hierarchy (later layers win):
//! 1. Built-in defaults
//! 2. `config/nosa.yaml`, if present
//! 3. `config/<NOSA_ENV>.yaml`, if present (`NOSA_ENV` defaults to `production`)
//! 4. `NOSA_*` environment variables, nested with `__`
//!    (`NOSA_STORE__CAPACITY=5000`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod engine;
mod error;
mod server;
mod telemetry;
mod validation;

pub use capture::CaptureConfig;
pub use engine::{HubConfig, StoreConfig};
pub use error::ConfigError;
pub use server::ServerConfig;
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/nosa.yaml";
const ENV_PREFIX: &str = "NOSA_";

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct NosaConfig {
    /// Capture primitive parameters.
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Packet store sizing.
    #[validate(nested)]
    #[serde(default)]
    pub store: StoreConfig,

    /// Broadcast hub sizing.
    #[validate(nested)]
    #[serde(default)]
    pub hub: HubConfig,

    /// HTTP/WebSocket listener.
    #[validate(nested)]
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl NosaConfig {
    /// Load configuration from the default files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(NosaConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("NOSA_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file, still honouring `NOSA_*`
    /// environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment =
            Figment::from(Serialized::defaults(NosaConfig::default())).merge(Yaml::file(path));
        Self::extract(figment)
    }

    /// Re-validates after in-process changes such as command-line overrides.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate_all()?;
        Ok(config)
    }
}
