//! Packet capture configuration.
//!
//! Parameters handed to the capture primitive on every start/resume, plus the
//! bounded wait applied when a running capture loop is stopped or paused.

use serde::{Deserialize, Deserializer, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Network interface for live capture. `None` selects the default device.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default)]
    pub interface: Option<String>,

    /// Run in promiscuous mode?
    #[serde(default = "default_promiscuous")]
    pub promiscuous: bool,

    /// Snapshot length in bytes.
    #[validate(range(min = 64, max = 262144))]
    #[serde(default = "default_snaplen", deserialize_with = "deserialize_size")]
    pub snaplen: usize,

    /// Read timeout of the capture handle (milliseconds). Bounds how long the
    /// capture loop can go without checking its stop signal.
    #[validate(range(min = 1, max = 5000))]
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u32,

    /// Optional BPF filter expression.
    #[validate(length(min = 1))]
    #[serde(default)]
    pub filter: Option<String>,

    /// How long stop/pause wait for the capture loop to exit (milliseconds).
    #[validate(range(min = 100, max = 60000))]
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

fn default_promiscuous() -> bool {
    true
}

fn default_snaplen() -> usize {
    65535
}

fn default_read_timeout() -> u32 {
    250
}

fn default_shutdown_timeout() -> u64 {
    2000
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Num(usize),
    Str(String),
}

/// Accepts either a plain byte count or a human‑friendly size such as "64KiB".
fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Num(n) => Ok(n),
        SizeValue::Str(s) => parse_size(&s).map_err(serde::de::Error::custom),
    }
}

fn parse_size(raw: &str) -> Result<usize, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (num_part, unit_part) = raw.split_at(split);
    let number: f64 = num_part
        .parse()
        .map_err(|e| format!("invalid size '{raw}': {e}"))?;
    let multiplier = match unit_part.trim().to_lowercase().as_str() {
        "" | "b" => 1.0,
        "kb" | "kib" => 1024.0,
        "mb" | "mib" => 1024.0 * 1024.0,
        unit => return Err(format!("unknown size unit '{unit}'")),
    };
    Ok((number * multiplier) as usize)
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            promiscuous: default_promiscuous(),
            snaplen: default_snaplen(),
            read_timeout_ms: default_read_timeout(),
            filter: None,
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}
