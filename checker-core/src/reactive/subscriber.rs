//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: memos,
//! effects and async computeds. A source is anything a subscriber can read
//! from: signals and memos.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use indexmap::IndexMap;
use parking_lot::Mutex;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. The ID is the key under
/// which sources remember it, so re-reading a source never duplicates a
/// subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a source (signal or memo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that is notified when one of its sources changes.
pub trait Subscriber: Send + Sync {
    /// The subscriber's unique ID.
    fn subscriber_id(&self) -> SubscriberId;

    /// Invalidate any cached value. Effects have nothing to invalidate.
    fn mark_dirty(&self);

    /// Eager subscribers (effects) re-run during propagation; lazy ones
    /// (memos) recompute on their next read.
    fn is_eager(&self) -> bool;

    /// Re-run the computation. Only called on eager subscribers.
    fn run(&self);

    /// Subscribers that depend on this one. Non-empty only for memos,
    /// which are sources as well.
    fn dependents(&self) -> Vec<Weak<dyn Subscriber>>;
}

/// Something a subscriber can depend on.
pub trait Source: Send + Sync {
    /// The source's unique ID.
    fn source_id(&self) -> SourceId;

    /// Register a subscriber. Registering an existing subscriber again
    /// keeps its original position.
    fn subscribe(&self, id: SubscriberId, subscriber: Weak<dyn Subscriber>);

    /// Remove a subscriber.
    fn unsubscribe(&self, id: SubscriberId);
}

/// Insertion-ordered set of subscribers held by a source.
///
/// Subscribers are stored weakly: a computation whose last handle was
/// dropped simply fails to upgrade and is pruned on the next snapshot.
#[derive(Default)]
pub(crate) struct SubscriberSet {
    entries: Mutex<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl SubscriberSet {
    pub(crate) fn insert(&self, id: SubscriberId, subscriber: Weak<dyn Subscriber>) {
        let mut entries = self.entries.lock();
        // `entry` keeps the existing slot, which preserves notification order.
        entries.entry(id).or_insert(subscriber);
    }

    pub(crate) fn remove(&self, id: SubscriberId) {
        // `shift_remove` keeps the remaining subscribers in order.
        self.entries.lock().shift_remove(&id);
    }

    /// Live subscribers in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Weak<dyn Subscriber>> {
        let mut entries = self.entries.lock();
        entries.retain(|_, weak| weak.strong_count() > 0);
        entries.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
