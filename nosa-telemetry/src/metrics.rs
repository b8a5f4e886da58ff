//! ## nosa-telemetry::metrics
//! **Prometheus counters for the capture pipeline**
//!
//! Frames flow `seen → accepted | rejected`; every accepted record is
//! published once to the hub, which reports how many subscribers it had to
//! evict.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub frames_seen: IntCounter,
    pub records_accepted: IntCounter,
    pub frames_rejected: IntCounter,
    pub records_published: IntCounter,
    pub subscribers_evicted: IntCounter,
    pub subscribers_live: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let frames_seen = IntCounter::new(
            "nosa_frames_total",
            "Raw frames pulled from the capture source",
        )?;
        let records_accepted = IntCounter::new(
            "nosa_records_accepted_total",
            "Frames classified into packet records",
        )?;
        let frames_rejected = IntCounter::new(
            "nosa_frames_rejected_total",
            "Frames dropped for lacking a network-layer header",
        )?;
        let records_published = IntCounter::new(
            "nosa_records_published_total",
            "Packet records fanned out to subscribers",
        )?;
        let subscribers_evicted = IntCounter::new(
            "nosa_subscribers_evicted_total",
            "Subscribers removed after a failed delivery",
        )?;
        let subscribers_live =
            IntGauge::new("nosa_subscribers", "Currently registered subscribers")?;

        registry.register(Box::new(frames_seen.clone()))?;
        registry.register(Box::new(records_accepted.clone()))?;
        registry.register(Box::new(frames_rejected.clone()))?;
        registry.register(Box::new(records_published.clone()))?;
        registry.register(Box::new(subscribers_evicted.clone()))?;
        registry.register(Box::new(subscribers_live.clone()))?;

        Ok(Self {
            registry,
            frames_seen,
            records_accepted,
            frames_rejected,
            records_published,
            subscribers_evicted,
            subscribers_live,
        })
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
