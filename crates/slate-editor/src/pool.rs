//! Connection pool: deduplication and batching for rapid connect gestures.
//!
//! A pointer drag from one handle to another can emit several connect
//! events before settling. The pool keeps an O(1) direction-sensitive
//! existence index over (source, target) pairs — covering both committed
//! connections and accepted-but-unflushed requests — so every event after
//! the first is rejected without touching the graph. Accepted requests are
//! buffered and flushed either at the next frame tick or as soon as the
//! buffer reaches capacity, whichever comes first.

use slate_core::{Anchor, Connection, ConnectionId, ElementId, Rejection};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Requests buffered beyond this count force an immediate flush, bounding
/// memory and guaranteeing forward progress under pathological input.
pub const DEFAULT_CAPACITY: usize = 16;

/// A connect request as it arrives from the gesture layer. The pool
/// assigns no id; connections are materialized at flush time.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    pub source: ElementId,
    pub target: ElementId,
    pub source_anchor: Option<Anchor>,
    pub target_anchor: Option<Anchor>,
    pub label: Option<String>,
}

impl ConnectionRequest {
    pub fn new(source: ElementId, target: ElementId) -> Self {
        Self {
            source,
            target,
            source_anchor: None,
            target_anchor: None,
            label: None,
        }
    }
}

#[derive(Debug)]
pub struct ConnectionPool {
    /// Direction-sensitive pair index: `(a, b)` and `(b, a)` are distinct.
    index: HashSet<(ElementId, ElementId)>,
    /// Committed connection id → pair, so deletions evict the index entry.
    by_id: HashMap<ConnectionId, (ElementId, ElementId)>,
    /// Accepted requests awaiting flush to the owning graph.
    pending: SmallVec<[ConnectionRequest; 8]>,
    capacity: usize,
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ConnectionPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashSet::new(),
            by_id: HashMap::new(),
            pending: SmallVec::new(),
            capacity: capacity.max(1),
        }
    }

    /// True if a connection between the ordered pair exists or is buffered.
    pub fn has(&self, source: ElementId, target: ElementId) -> bool {
        self.index.contains(&(source, target))
    }

    /// Accept a request into the buffer, or reject it without side effects.
    pub fn add(&mut self, request: ConnectionRequest) -> Result<(), Rejection> {
        if request.source == request.target {
            return Err(Rejection::SelfLoop);
        }
        if self.has(request.source, request.target) {
            return Err(Rejection::DuplicateConnection);
        }
        self.index.insert((request.source, request.target));
        self.pending.push(request);
        Ok(())
    }

    /// Whether the buffer has hit capacity and must be flushed now rather
    /// than waiting for the next tick.
    pub fn needs_immediate_flush(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand the buffered requests to the controller for materialization.
    /// Their index entries are dropped here; the controller re-registers
    /// each request that actually lands in the graph via [`track`](Self::track).
    pub fn drain_pending(&mut self) -> SmallVec<[ConnectionRequest; 8]> {
        let drained = std::mem::take(&mut self.pending);
        for request in &drained {
            self.index.remove(&(request.source, request.target));
        }
        drained
    }

    /// Register a connection that exists in the graph (materialized request
    /// or snapshot adoption).
    pub fn track(&mut self, connection: &Connection) {
        self.index.insert((connection.source, connection.target));
        self.by_id
            .insert(connection.id, (connection.source, connection.target));
    }

    /// Evict a deleted connection. Must be called on every deletion path —
    /// explicit delete and cascading element delete alike — to avoid stale
    /// "already exists" rejections.
    pub fn remove(&mut self, id: ConnectionId) {
        if let Some(pair) = self.by_id.remove(&id) {
            self.index.remove(&pair);
        }
    }

    /// Rebuild the index from scratch (external graph replacement).
    pub fn rebuild<'a>(&mut self, connections: impl Iterator<Item = &'a Connection>) {
        self.index.clear();
        self.by_id.clear();
        self.pending.clear();
        for connection in connections {
            self.track(connection);
        }
    }

    /// Teardown: discard the buffer and index. Safe to call twice.
    pub fn cleanup(&mut self) {
        self.pending.clear();
        self.index.clear();
        self.by_id.clear();
    }
}
