//! Custom validation functions shared by the configuration sections.

use std::net::SocketAddr;

use validator::ValidationError;

/// Interface names as used by libpcap: Linux names (`eth0`, `br-1a2b`,
/// `eth0.100`) and Npcap device paths (`\Device\NPF_{GUID}`).
pub fn validate_interface(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9_.:\-\\{}]+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;

    if name.len() <= 256 && re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

pub fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_socket_addr"))
}

/// Accepts a bare level or a comma-separated list of `target=level` directives.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
    let valid = !level.trim().is_empty()
        && level.split(',').all(|directive| {
            let lvl = directive.rsplit('=').next().unwrap_or_default();
            LEVELS.contains(&lvl.trim().to_lowercase().as_str())
        });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
