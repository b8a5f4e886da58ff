//! # Engine
//!
//! Owns the store, the hub and the capture controller. One engine is built
//! at startup and shared with the transport layer; there is no global
//! instance.
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nosa_capture::SourceOpener;
use nosa_config::NosaConfig;
use nosa_telemetry::MetricsRecorder;
use serde::Serialize;
use tracing::info;

use crate::controller::{CaptureController, CaptureState, ControllerSettings};
use crate::error::TransitionError;
use crate::hub::{BroadcastHub, SubscriberId, Subscription};
use crate::pipeline::Pipeline;
use crate::query::{query, PacketFilter, QueryResult};
use crate::store::PacketStore;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub store_capacity: usize,
    pub subscriber_queue: usize,
    pub controller: ControllerSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_capacity: 1000,
            subscriber_queue: 1024,
            controller: ControllerSettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &NosaConfig) -> Self {
        Self {
            store_capacity: config.store.capacity,
            subscriber_queue: config.hub.subscriber_queue,
            controller: ControllerSettings {
                interface: config.capture.interface.clone(),
                shutdown_timeout: Duration::from_millis(config.capture.shutdown_timeout_ms),
            },
        }
    }
}

/// Status as reported to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub is_capturing: bool,
    /// Records currently held by the store.
    pub packets_captured: usize,
    pub capture_start_time: Option<DateTime<Utc>>,
    pub max_packets: usize,
    pub last_error: Option<String>,
}

pub struct Engine {
    store: Arc<PacketStore>,
    hub: BroadcastHub,
    controller: CaptureController,
    metrics: MetricsRecorder,
}

impl Engine {
    pub fn new(
        settings: EngineSettings,
        opener: Arc<dyn SourceOpener>,
        metrics: MetricsRecorder,
    ) -> Self {
        let store = Arc::new(PacketStore::new(settings.store_capacity));
        let hub = BroadcastHub::new(settings.subscriber_queue, metrics.clone());
        let pipeline = Pipeline::new(Arc::clone(&store), hub.clone(), metrics.clone());
        let controller = CaptureController::new(opener, pipeline, settings.controller);

        info!(
            capacity = store.capacity(),
            subscriber_queue = settings.subscriber_queue,
            "Engine initialized"
        );

        Self {
            store,
            hub,
            controller,
            metrics,
        }
    }

    pub fn start(&self) -> Result<(), TransitionError> {
        self.controller.start()
    }

    pub fn stop(&self) -> Result<(), TransitionError> {
        self.controller.stop()
    }

    pub fn pause(&self) -> Result<(), TransitionError> {
        self.controller.pause()
    }

    pub fn resume(&self) -> Result<(), TransitionError> {
        self.controller.resume()
    }

    pub fn status(&self) -> CaptureStatus {
        let view = self.controller.view();
        CaptureStatus {
            state: view.state,
            is_capturing: view.state == CaptureState::Running,
            packets_captured: self.store.len(),
            capture_start_time: view.started_at,
            max_packets: self.store.capacity(),
            last_error: view.last_error,
        }
    }

    pub fn query(&self, filter: &PacketFilter, limit: Option<usize>) -> QueryResult {
        query(&self.store, filter, limit)
    }

    /// Drops every stored record; returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.store.clear();
        info!(dropped, "Packet store cleared");
        dropped
    }

    pub fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.hub.unsubscribe(id)
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Stops any running or paused capture.
    pub fn shutdown(&self) {
        match self.controller.stop() {
            Ok(()) | Err(TransitionError::NotRunning) => {}
            Err(e) => tracing::warn!(error = %e, "Capture did not stop cleanly"),
        }
    }
}
