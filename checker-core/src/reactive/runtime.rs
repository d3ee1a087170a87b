//! Reactive Runtime
//!
//! The runtime connects signals, memos and effects when a value changes.
//!
//! # How It Works
//!
//! 1. Signals and memos keep their own ordered subscriber sets; reading a
//!    source inside a reactive context subscribes the running computation.
//!
//! 2. When a signal is written, the runtime walks its subscribers:
//!    a. Memos are marked dirty and their own dependents are visited
//!    b. Effects are collected, in the order they are first reached
//!
//! 3. Once the whole reachable graph is marked, the collected effects run.
//!    Memos are lazy and recompute on their next read, so an effect never
//!    observes a memo that still holds a pre-write value.
//!
//! Propagation is synchronous. An effect that writes another signal starts
//! a nested propagation that completes before the outer one continues.
//!
//! # Threads
//!
//! A write and the cascade it starts hold a process-wide reentrant lock, so
//! cascades started on different threads run one after the other and never
//! interleave. Nested writes from effects on the same thread re-enter the
//! lock. Reads never take it.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::{const_reentrant_mutex, ReentrantMutex};

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

static WRITE_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

/// Coordinator for change propagation.
pub struct Runtime;

impl Runtime {
    /// Run `write` while holding the write lock. Writes from other threads
    /// wait until `write`, and every cascade it starts, has returned.
    pub(crate) fn exclusive<R>(write: impl FnOnce() -> R) -> R {
        let _guard = WRITE_LOCK.lock();
        write()
    }

    /// Propagate a change to the given subscribers and everything
    /// downstream of them.
    pub fn propagate(subscribers: Vec<Weak<dyn Subscriber>>) {
        if subscribers.is_empty() {
            return;
        }

        let mut visited = HashSet::new();
        let mut effects = Vec::new();
        Self::mark(subscribers, &mut visited, &mut effects);

        tracing::trace!(
            marked = visited.len(),
            effects = effects.len(),
            "running scheduled effects"
        );

        for effect in effects {
            effect.run();
        }
    }

    /// Depth-first marking phase. Effects are appended to `effects` in the
    /// order they are first reached.
    fn mark(
        subscribers: Vec<Weak<dyn Subscriber>>,
        visited: &mut HashSet<SubscriberId>,
        effects: &mut Vec<Arc<dyn Subscriber>>,
    ) {
        for weak in subscribers {
            let Some(subscriber) = weak.upgrade() else {
                continue;
            };
            if !visited.insert(subscriber.subscriber_id()) {
                continue;
            }

            subscriber.mark_dirty();

            if subscriber.is_eager() {
                effects.push(subscriber);
            } else {
                Self::mark(subscriber.dependents(), visited, effects);
            }
        }
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracking context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_tracking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    struct MockReactive {
        id: SubscriberId,
        dirty: AtomicBool,
        runs: AtomicI32,
        eager: bool,
        dependents: Vec<Weak<dyn Subscriber>>,
    }

    impl MockReactive {
        fn new(eager: bool, dependents: Vec<Weak<dyn Subscriber>>) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                dirty: AtomicBool::new(false),
                runs: AtomicI32::new(0),
                eager,
                dependents,
            })
        }
    }

    impl Subscriber for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn mark_dirty(&self) {
            self.dirty.store(true, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }

        fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }

        fn dependents(&self) -> Vec<Weak<dyn Subscriber>> {
            self.dependents.clone()
        }
    }

    fn weak(r: &Arc<MockReactive>) -> Weak<dyn Subscriber> {
        let r: Arc<dyn Subscriber> = r.clone();
        Arc::downgrade(&r)
    }

    #[test]
    fn runtime_marks_memos_and_runs_effects() {
        let memo = MockReactive::new(false, Vec::new());
        let effect = MockReactive::new(true, Vec::new());

        Runtime::propagate(vec![weak(&memo), weak(&effect)]);

        // Both should be marked dirty
        assert!(memo.dirty.load(Ordering::SeqCst));
        assert!(effect.dirty.load(Ordering::SeqCst));

        // Only the effect runs (memos are lazy)
        assert_eq!(memo.runs.load(Ordering::SeqCst), 0);
        assert_eq!(effect.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_reaches_effects_through_memos_once() {
        let effect = MockReactive::new(true, Vec::new());
        let memo = MockReactive::new(false, vec![weak(&effect)]);

        // The effect depends on the signal directly and through the memo.
        Runtime::propagate(vec![weak(&memo), weak(&effect)]);

        assert!(memo.dirty.load(Ordering::SeqCst));
        assert_eq!(effect.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_skips_dropped_subscribers() {
        let effect = MockReactive::new(true, Vec::new());
        let stale = weak(&effect);
        drop(effect);

        Runtime::propagate(vec![stale]);
    }
}
