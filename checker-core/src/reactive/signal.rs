//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal is written, every subscriber is notified, in the order
//!    in which they first subscribed. Writes always notify, even when the
//!    new value equals the old one.
//!
//! 3. Notification runs synchronously: by the time `set` returns, every
//!    dependent effect has re-run.
//!
//! # Thread Safety
//!
//! Signals are `Send + Sync`: the value sits behind a `RwLock` that is never
//! held while subscribers run, so an effect may freely read or write the
//! signal that triggered it. Writes from different threads are serialized
//! together with their cascades; see [`Runtime`].

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Source, SourceId, Subscriber, SubscriberId, SubscriberSet};

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use checker_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    id: SourceId,
    value: RwLock<T>,
    subscribers: SubscriberSet,
}

impl<T> Source for SignalInner<T>
where
    T: Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn subscribe(&self, id: SubscriberId, subscriber: Weak<dyn Subscriber>) {
        self.subscribers.insert(id, subscriber);
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.remove(id);
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::new(),
                value: RwLock::new(value),
                subscribers: SubscriberSet::default(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, tracking it as a dependency of the running
    /// computation.
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.read().clone()
    }

    /// Borrow the current value, tracking it as a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.read())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Register this signal as a dependency without reading it.
    pub fn track(&self) {
        let source: Arc<dyn Source> = self.inner.clone();
        ReactiveContext::track(source);
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        Runtime::exclusive(|| {
            *self.inner.value.write() = value;
            self.notify();
        });
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// Subscribers are notified even if `f` leaves the value unchanged.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        Runtime::exclusive(|| {
            f(&mut self.inner.value.write());
            self.notify();
        });
    }

    fn notify(&self) {
        let subscribers = self.inner.subscribers.snapshot();
        tracing::trace!(source = ?self.inner.id, subscribers = subscribers.len(), "signal changed");
        Runtime::propagate(subscribers);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
