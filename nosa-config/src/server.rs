//! HTTP/WebSocket listener configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate, ValidationError};

use crate::validation;

/// Transport configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = "validate_limits"))]
pub struct ServerConfig {
    /// Socket address the API listens on.
    #[validate(custom(function = validation::validate_socket_addr))]
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Packets returned by a query that does not specify a limit.
    #[validate(range(min = 1))]
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest limit a query may request.
    #[validate(range(min = 1, max = 1_000_000))]
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8000".into()
}

fn default_limit() -> usize {
    100
}

fn default_max_limit() -> usize {
    1000
}

fn validate_limits(config: &ServerConfig) -> Result<(), ValidationError> {
    if config.default_limit > config.max_limit {
        return Err(ValidationError::new("default_limit_exceeds_max_limit"));
    }
    Ok(())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}
