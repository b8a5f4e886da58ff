//! ## nosa-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! Capture lifecycle changes are emitted as structured events carrying
//! OpenTelemetry attributes, so they can be filtered and exported alongside
//! the regular log stream.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global fmt subscriber. `RUST_LOG` overrides `level`.
    ///
    /// Returns `false` when a global subscriber was already installed.
    pub fn init(level: &str, ansi: bool) -> bool {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_thread_names(true)
            .with_ansi(ansi)
            .try_init()
            .is_ok()
    }

    /// Emits a capture lifecycle event.
    pub fn log_event(event_type: &str, metadata: &[KeyValue]) {
        let span = info_span!(
            "capture_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );

        span.in_scope(|| {
            tracing::info!(
                metadata = ?metadata,
                "Capture lifecycle event"
            );
        });
    }
}
