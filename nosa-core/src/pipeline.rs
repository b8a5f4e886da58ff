//! Per-frame path of the capture thread: classify, store, publish.
use std::sync::Arc;

use nosa_capture::Frame;
use nosa_telemetry::MetricsRecorder;

use crate::classifier::classify;
use crate::hub::BroadcastHub;
use crate::store::PacketStore;

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<PacketStore>,
    hub: BroadcastHub,
    metrics: MetricsRecorder,
}

impl Pipeline {
    pub fn new(store: Arc<PacketStore>, hub: BroadcastHub, metrics: MetricsRecorder) -> Self {
        Self {
            store,
            hub,
            metrics,
        }
    }

    /// Returns whether the frame produced a record.
    pub fn handle(&self, frame: &Frame) -> bool {
        self.metrics.frames_seen.inc();
        match classify(frame) {
            Some(record) => {
                let record = Arc::new(record);
                self.store.append(Arc::clone(&record));
                self.hub.publish(&record);
                self.metrics.records_accepted.inc();
                true
            }
            None => {
                self.metrics.frames_rejected.inc();
                false
            }
        }
    }
}
