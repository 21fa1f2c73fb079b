//! Publish/subscribe registry with a deduplicated dirty list.
//!
//! Dependents never hold references to their sources. They register
//! interest in `(source, kind)` pairs; publishing an event only queues the
//! dependent, and the owner of the bus decides when to drain the queue and
//! recompute.

use std::collections::HashMap;
use std::hash::Hash;

/// Kind of change a source can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Geometry moved without changing structure.
    Moved,
    /// Derived data of the source changed (e.g. a surface was rebuilt).
    Changed,
    /// The set of points referenced by the source changed.
    TopologyChanged,
    /// The source was removed.
    Deleted,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [EventKind; 4] = [
        EventKind::Moved,
        EventKind::Changed,
        EventKind::TopologyChanged,
        EventKind::Deleted,
    ];
}

/// Registry mapping `(source, kind)` to interested dependents.
#[derive(Debug, Clone)]
pub struct EventBus<S, D> {
    subscriptions: HashMap<(S, EventKind), Vec<D>>,
    queue: Vec<(D, EventKind)>,
}

impl<S, D> Default for EventBus<S, D> {
    fn default() -> Self {
        Self {
            subscriptions: HashMap::new(),
            queue: Vec::new(),
        }
    }
}

impl<S, D> EventBus<S, D>
where
    S: Copy + Eq + Hash,
    D: Copy + Eq,
{
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `dependent` for events of `kind` published by `source`.
    pub fn subscribe(&mut self, source: S, kind: EventKind, dependent: D) {
        let list = self.subscriptions.entry((source, kind)).or_default();
        if !list.contains(&dependent) {
            list.push(dependent);
        }
    }

    /// Register `dependent` for every event kind of `source`.
    pub fn subscribe_all(&mut self, source: S, dependent: D) {
        for kind in EventKind::ALL {
            self.subscribe(source, kind, dependent);
        }
    }

    /// Drop every subscription and pending event of `dependent`.
    pub fn unsubscribe_all(&mut self, dependent: D) {
        for list in self.subscriptions.values_mut() {
            list.retain(|d| *d != dependent);
        }
        self.subscriptions.retain(|_, list| !list.is_empty());
        self.queue.retain(|(d, _)| *d != dependent);
    }

    /// Drop every subscription on `source`.
    pub fn forget_source(&mut self, source: S) {
        self.subscriptions.retain(|(s, _), _| *s != source);
    }

    /// Dependents currently subscribed to `(source, kind)`.
    pub fn subscribers(&self, source: S, kind: EventKind) -> &[D] {
        self.subscriptions
            .get(&(source, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Publish an event. Returns the number of newly queued dependents.
    pub fn notify(&mut self, source: S, kind: EventKind) -> usize {
        let Some(list) = self.subscriptions.get(&(source, kind)) else {
            return 0;
        };
        let mut queued = 0;
        for dependent in list {
            if !self.queue.contains(&(*dependent, kind)) {
                self.queue.push((*dependent, kind));
                queued += 1;
            }
        }
        queued
    }

    /// Whether any dependent is waiting.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Take the queued `(dependent, kind)` pairs in publication order.
    pub fn drain(&mut self) -> Vec<(D, EventKind)> {
        std::mem::take(&mut self.queue)
    }
}
