//! # nosa telemetry
//!
//! Logging setup, structured lifecycle events and Prometheus metrics.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
