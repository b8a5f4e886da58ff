//! Filtering and limiting over a store snapshot.
use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

use crate::record::PacketRecord;
use crate::store::PacketStore;

/// Conjunctive record filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketFilter {
    /// Protocol name, compared case-insensitively.
    pub protocol: Option<String>,
    pub source_ip: Option<IpAddr>,
    pub destination_ip: Option<IpAddr>,
}

impl PacketFilter {
    pub fn matches(&self, record: &PacketRecord) -> bool {
        self.protocol
            .as_deref()
            .map_or(true, |p| record.protocol.matches(p))
            && self.source_ip.map_or(true, |ip| record.source == ip)
            && self.destination_ip.map_or(true, |ip| record.destination == ip)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    /// Matching records, oldest first.
    pub packets: Vec<Arc<PacketRecord>>,
    /// Records held by the store when the query ran.
    pub total_count: usize,
    /// Records matching the filter, before the limit was applied.
    pub filtered_count: usize,
}

/// Runs `filter` over one snapshot of `store` and keeps the `limit` most
/// recent matches. `None` or `Some(0)` keeps every match.
pub fn query(store: &PacketStore, filter: &PacketFilter, limit: Option<usize>) -> QueryResult {
    let snapshot = store.snapshot();
    let total_count = snapshot.len();

    let mut packets: Vec<Arc<PacketRecord>> = snapshot
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect();
    let filtered_count = packets.len();

    if let Some(limit) = limit.filter(|l| *l > 0) {
        if packets.len() > limit {
            packets.drain(..packets.len() - limit);
        }
    }

    QueryResult {
        packets,
        total_count,
        filtered_count,
    }
}
