//! Memo Implementation
//!
//! A Memo is a cached derived value (a synchronous computed).
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its computation once to capture its
//!    initial value and dependencies.
//!
//! 2. When a dependency changes, the runtime marks the memo dirty and
//!    forwards the change to the memo's own dependents.
//!
//! 3. The next read of a dirty memo recomputes it (re-collecting its
//!    dependency set); reads of a clean memo return the cached value.
//!
//! Because recomputation happens on read, an effect that reads both a
//! signal and a memo derived from it always sees the two agree.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::context::{Dependencies, ReactiveContext};
use super::effect::release_stale;
use super::subscriber::{Source, SourceId, Subscriber, SubscriberId, SubscriberSet};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed since the last computation.
    Dirty,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Example
///
/// ```rust
/// use checker_core::reactive::{Memo, Signal};
///
/// let count = Signal::new(2);
/// let c = count.clone();
/// let doubled = Memo::new(move || c.get() * 2);
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

struct MemoInner<T> {
    source_id: SourceId,
    subscriber_id: SubscriberId,
    this: Weak<MemoInner<T>>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: Mutex<MemoState>,
    dependencies: Mutex<Dependencies>,
    dependents: SubscriberSet,
    disposed: AtomicBool,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo and compute its initial value.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|this| MemoInner {
            source_id: SourceId::new(),
            subscriber_id: SubscriberId::new(),
            this: this.clone(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: Mutex::new(MemoState::Dirty),
            dependencies: Mutex::new(Dependencies::new()),
            dependents: SubscriberSet::default(),
            disposed: AtomicBool::new(false),
        });

        inner.recompute();

        Self { inner }
    }

    /// Get the memo's source ID.
    pub fn id(&self) -> SourceId {
        self.inner.source_id
    }

    /// Get the current value, recomputing if necessary, and track the memo
    /// as a dependency of the running computation.
    pub fn get(&self) -> T {
        let source: Arc<dyn Source> = self.inner.clone();
        ReactiveContext::track(source);
        self.inner.current()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.current()
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.lock()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.len()
    }

    /// Get the number of dependencies collected by the last computation.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }

    /// Detach the memo from its dependencies. It keeps returning the value
    /// it held at disposal.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        let dependencies = std::mem::take(&mut *self.inner.dependencies.lock());
        for source in dependencies {
            source.unsubscribe(self.inner.subscriber_id);
        }
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn current(&self) -> T {
        let stale = *self.state.lock() == MemoState::Dirty;
        if stale && !self.disposed.load(Ordering::SeqCst) {
            return self.recompute();
        }
        let cached = self.value.read().clone();
        match cached {
            Some(value) => value,
            None => self.recompute(),
        }
    }

    fn recompute(&self) -> T {
        let this: Weak<dyn Subscriber> = self.this.clone();
        let ctx = ReactiveContext::enter(self.subscriber_id, this);
        let value = (self.compute)();
        let fresh = ctx.finish();

        let previous = std::mem::replace(&mut *self.dependencies.lock(), fresh.clone());
        release_stale(self.subscriber_id, previous, &fresh);

        *self.value.write() = Some(value.clone());
        *self.state.lock() = MemoState::Clean;

        value
    }
}

impl<T> Source for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.source_id
    }

    fn subscribe(&self, id: SubscriberId, subscriber: Weak<dyn Subscriber>) {
        self.dependents.insert(id, subscriber);
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.dependents.remove(id);
    }
}

impl<T> Subscriber for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_dirty(&self) {
        *self.state.lock() = MemoState::Dirty;
    }

    fn is_eager(&self) -> bool {
        false
    }

    fn run(&self) {}

    fn dependents(&self) -> Vec<Weak<dyn Subscriber>> {
        self.dependents.snapshot()
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        for source in self.dependencies.get_mut().drain(..) {
            source.unsubscribe(self.subscriber_id);
        }
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source_id)
            .field("state", &self.state())
            .field("value", &*self.inner.value.read())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
