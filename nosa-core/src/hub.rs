//! # Broadcast hub
//!
//! Fans every accepted record out to all live subscribers. Each subscriber
//! owns a bounded queue; delivery is a non-blocking enqueue, so a stalled
//! subscriber can never hold up the capture thread. A subscriber whose queue
//! is full or whose receiver is gone is evicted on the spot.
//!
//! Publishing snapshots the registry under the read lock, delivers with the
//! lock released and then sweeps the failed subscribers under the write lock.
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use nosa_telemetry::MetricsRecorder;
use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::debug;

use crate::record::PacketRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Outbox = mpsc::Sender<Arc<PacketRecord>>;

struct HubInner {
    subscribers: RwLock<HashMap<SubscriberId, Outbox>>,
    next_id: AtomicU64,
    queue_depth: usize,
    metrics: MetricsRecorder,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let removed = subscribers.remove(&id).is_some();
        self.metrics.subscribers_live.set(subscribers.len() as i64);
        removed
    }
}

#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new(queue_depth: usize, metrics: MetricsRecorder) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_depth: queue_depth.max(1),
                metrics,
            }),
        }
    }

    /// Registers a new subscriber with its own bounded queue.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.queue_depth);

        let live = {
            let mut subscribers = self.inner.subscribers.write();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        self.inner.metrics.subscribers_live.set(live as i64);
        debug!(subscriber = %id, live, "Subscriber registered");

        Subscription {
            id,
            receiver: rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a subscriber. Unknown or already removed ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    /// Delivers `record` to every registered subscriber and returns how many
    /// accepted it. Failed subscribers are evicted; the caller never sees
    /// their failure.
    pub fn publish(&self, record: &Arc<PacketRecord>) -> usize {
        let targets: Vec<(SubscriberId, Outbox)> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(record)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = %id, "Subscriber queue full, evicting");
                    failed.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = %id, "Subscriber disconnected, evicting");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.inner.subscribers.write();
            for id in &failed {
                subscribers.remove(id);
            }
            self.inner.metrics.subscribers_live.set(subscribers.len() as i64);
            self.inner
                .metrics
                .subscribers_evicted
                .inc_by(failed.len() as u64);
        }
        self.inner.metrics.records_published.inc();

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

/// Receiving end of a hub registration. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<PacketRecord>>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next record. Returns `None` once the subscriber has been
    /// evicted (or the hub is gone) and the queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<PacketRecord>> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<PacketRecord>> {
        match self.receiver.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stops accepting deliveries. Records already queued stay readable; the
    /// hub evicts this subscriber on its next publish.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
