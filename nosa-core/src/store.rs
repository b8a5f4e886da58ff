//! # Bounded packet store
//!
//! Fixed-capacity, insertion-ordered history of recent packet records.
//! Appending past capacity evicts exactly one record, the oldest.
//!
//! Records are shared as `Arc<PacketRecord>` so snapshots and hub deliveries
//! never copy the record itself. A snapshot is a separate `Vec`, so later
//! appends or clears never show up in it.
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::PacketRecord;

#[derive(Debug)]
pub struct PacketStore {
    records: RwLock<VecDeque<Arc<PacketRecord>>>,
    capacity: usize,
}

impl PacketStore {
    /// Creates an empty store. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a record as the newest entry, returning the evicted oldest
    /// record when the store was full.
    pub fn append(&self, record: Arc<PacketRecord>) -> Option<Arc<PacketRecord>> {
        let mut records = self.records.write();
        let evicted = if records.len() >= self.capacity {
            records.pop_front()
        } else {
            None
        };
        records.push_back(record);
        evicted
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<Arc<PacketRecord>> {
        self.records.read().iter().cloned().collect()
    }

    /// Empties the store, returning how many records were dropped.
    pub fn clear(&self) -> usize {
        let mut records = self.records.write();
        let dropped = records.len();
        records.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Protocol;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use std::net::{IpAddr, Ipv4Addr};

    /// Records are told apart by `packet_size`.
    fn record(n: usize) -> Arc<PacketRecord> {
        Arc::new(PacketRecord {
            timestamp: DateTime::<Utc>::from_timestamp(n as i64, 0).unwrap_or_default(),
            source: IpAddr::V4(Ipv4Addr::LOCALHOST),
            destination: IpAddr::V4(Ipv4Addr::LOCALHOST),
            protocol: Protocol::Ip,
            packet_size: n,
            source_port: None,
            destination_port: None,
            ttl: None,
            flags: None,
        })
    }

    fn sizes(records: &[Arc<PacketRecord>]) -> Vec<usize> {
        records.iter().map(|r| r.packet_size).collect()
    }

    #[test]
    fn evicts_the_oldest_single_record() {
        let store = PacketStore::new(3);
        for n in 0..3 {
            assert!(store.append(record(n)).is_none());
        }
        let evicted = store.append(record(3)).unwrap();
        assert_eq!(evicted.packet_size, 0);
        assert_eq!(sizes(&store.snapshot()), vec![1, 2, 3]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let store = PacketStore::new(4);
        store.append(record(1));
        store.append(record(2));

        assert_eq!(store.clear(), 2);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 4);
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutation() {
        let store = PacketStore::new(2);
        store.append(record(1));
        let before = store.snapshot();

        store.append(record(2));
        store.append(record(3));
        store.clear();

        assert_eq!(sizes(&before), vec![1]);
    }

    #[test]
    fn concurrent_readers_see_consistent_prefixes() {
        let store = Arc::new(PacketStore::new(64));
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..1000 {
                    store.append(record(n));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = sizes(&store.snapshot());
                        assert!(snap.len() <= 64);
                        assert!(snap.windows(2).all(|w| w[1] == w[0] + 1));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(sizes(&store.snapshot()), (936..1000).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn keeps_the_most_recent_records_in_order(capacity in 1usize..32, count in 0usize..128) {
            let store = PacketStore::new(capacity);
            for n in 0..count {
                store.append(record(n));
            }

            let expected: Vec<usize> = (count.saturating_sub(capacity)..count).collect();
            let snapshot = store.snapshot();
            prop_assert!(snapshot.len() <= capacity);
            prop_assert_eq!(sizes(&snapshot), expected);
        }
    }
}
