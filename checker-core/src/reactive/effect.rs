//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect re-runs synchronously as part
//!    of the write that changed it.
//!
//! 3. Every run collects a fresh dependency set. Sources read during the
//!    previous run but not this one are unsubscribed afterwards, so the
//!    dependency set never accumulates.
//!
//! # Lifetime
//!
//! Clones share the same effect. The effect stops running when it is
//! disposed or when its last handle is dropped; either way it is removed
//! from every source it subscribed to.
//!
//! A panic inside the effect body unwinds into whoever triggered the run.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::context::{Dependencies, ReactiveContext};
use super::subscriber::{Source, Subscriber, SubscriberId};

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use checker_core::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Signal::new(Vec::new());
///
/// let (c, s) = (count.clone(), seen.clone());
/// let _effect = Effect::new(move || {
///     let value = c.get();
///     s.update(|v| v.push(value));
/// });
///
/// count.set(5);
/// assert_eq!(seen.get(), vec![0, 5]);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    id: SubscriberId,
    this: Weak<EffectInner>,
    run: Box<dyn Fn() + Send + Sync>,
    dependencies: Mutex<Dependencies>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            this: this.clone(),
            run: Box::new(run),
            dependencies: Mutex::new(Dependencies::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        inner.execute();

        Self { inner }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the effect function now, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again and no longer
    /// subscribes to anything.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.detach();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies collected by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.lock().len()
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let this: Weak<dyn Subscriber> = self.this.clone();
        let ctx = ReactiveContext::enter(self.id, this);
        (self.run)();
        let fresh = ctx.finish();

        let previous = std::mem::replace(&mut *self.dependencies.lock(), fresh.clone());
        release_stale(self.id, previous, &fresh);

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn detach(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.lock());
        for source in dependencies {
            source.unsubscribe(self.id);
        }
    }
}

/// Unsubscribe `id` from every source in `previous` that was not read again.
pub(crate) fn release_stale(id: SubscriberId, previous: Dependencies, fresh: &Dependencies) {
    for source in previous {
        let still_read = fresh
            .iter()
            .any(|dep| dep.source_id() == source.source_id());
        if !still_read {
            source.unsubscribe(id);
        }
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn mark_dirty(&self) {}

    fn is_eager(&self) -> bool {
        true
    }

    fn run(&self) {
        self.execute();
    }

    fn dependents(&self) -> Vec<Weak<dyn Subscriber>> {
        Vec::new()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
