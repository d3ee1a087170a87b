//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the current computation is registered as one of its subscribers.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! Entering a context (running a memo or effect) pushes an entry; the guard
//! returned by [`ReactiveContext::enter`] pops it, either through
//! [`ReactiveContext::finish`] or on drop when the computation unwinds.
//!
//! Nested contexts are supported (a memo that reads another memo), as are
//! untracked sections, which push an entry with no subscriber.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use smallvec::SmallVec;

use super::subscriber::{Source, SourceId, Subscriber, SubscriberId};

/// Sources read by one run of a computation.
pub(crate) type Dependencies = SmallVec<[Arc<dyn Source>; 4]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The running computation, or `None` inside [`untracked`].
    subscriber: Option<(SubscriberId, Weak<dyn Subscriber>)>,
    /// Sources read so far during this run, deduplicated by ID.
    dependencies: Dependencies,
}

/// Guard for an entered context. Pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
    finished: bool,
}

impl ReactiveContext {
    /// Enter a tracking context for the given subscriber.
    ///
    /// While the guard is alive, every source that is read registers the
    /// subscriber as a dependent.
    pub fn enter(subscriber_id: SubscriberId, subscriber: Weak<dyn Subscriber>) -> Self {
        Self::push(Some((subscriber_id, subscriber)))
    }

    fn push(subscriber: Option<(SubscriberId, Weak<dyn Subscriber>)>) -> Self {
        let subscriber_id = subscriber.as_ref().map(|(id, _)| *id);
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber,
                dependencies: SmallVec::new(),
            });
        });

        Self {
            subscriber_id,
            finished: false,
        }
    }

    /// Check whether reads are currently being tracked.
    pub fn is_tracking() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.as_ref().map(|(id, _)| *id))
        })
    }

    /// Record a read of `source` by the running computation.
    ///
    /// Subscribes the computation to the source and remembers the source as
    /// a dependency of this run. Does nothing outside a tracking context.
    pub fn track(source: Arc<dyn Source>) {
        let source_id = source.source_id();
        let current = CONTEXT_STACK.with(|stack| {
            let stack = stack.borrow();
            let entry = stack.last()?;
            let (id, weak) = entry.subscriber.as_ref()?;
            let seen = entry
                .dependencies
                .iter()
                .any(|dep| dep.source_id() == source_id);
            (!seen).then(|| (*id, weak.clone()))
        });

        let Some((subscriber_id, subscriber)) = current else {
            return;
        };

        // The stack is not borrowed while the source takes its own lock.
        source.subscribe(subscriber_id, subscriber);

        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.dependencies.push(source);
            }
        });
    }

    /// IDs of the sources read so far in the current context.
    pub fn dependency_ids() -> Vec<SourceId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.iter().map(|d| d.source_id()).collect())
                .unwrap_or_default()
        })
    }

    /// Leave the context and hand back the sources read during the run.
    pub(crate) fn finish(mut self) -> Dependencies {
        self.finished = true;
        self.pop().map(|entry| entry.dependencies).unwrap_or_default()
    }

    fn pop(&self) -> Option<ContextEntry> {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.subscriber.as_ref().map(|(id, _)| *id),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }
        popped
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

/// Run `f` without registering any of its reads as dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::push(None);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    struct Noop(SubscriberId);

    impl Subscriber for Noop {
        fn subscriber_id(&self) -> SubscriberId {
            self.0
        }
        fn mark_dirty(&self) {}
        fn is_eager(&self) -> bool {
            false
        }
        fn run(&self) {}
        fn dependents(&self) -> Vec<Weak<dyn Subscriber>> {
            Vec::new()
        }
    }

    fn noop() -> (SubscriberId, Arc<dyn Subscriber>) {
        let id = SubscriberId::new();
        (id, Arc::new(Noop(id)))
    }

    #[test]
    fn context_tracks_subscriber() {
        let (id, sub) = noop();

        assert!(!ReactiveContext::is_tracking());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(id, Arc::downgrade(&sub));

            assert!(ReactiveContext::is_tracking());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_tracking());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn context_collects_each_source_once() {
        let (id, sub) = noop();
        let a = Signal::new(1);
        let b = Signal::new(2);

        let ctx = ReactiveContext::enter(id, Arc::downgrade(&sub));
        a.get();
        b.get();
        a.get();
        assert_eq!(ReactiveContext::dependency_ids().len(), 2);

        let deps = ctx.finish();
        assert_eq!(deps.len(), 2);
        assert_eq!(a.subscriber_count(), 1);
    }

    #[test]
    fn nested_contexts() {
        let (id1, sub1) = noop();
        let (id2, sub2) = noop();

        {
            let _ctx1 = ReactiveContext::enter(id1, Arc::downgrade(&sub1));
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(id2, Arc::downgrade(&sub2));
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn untracked_suspends_tracking() {
        let (id, sub) = noop();
        let signal = Signal::new(0);

        let ctx = ReactiveContext::enter(id, Arc::downgrade(&sub));
        untracked(|| {
            assert!(!ReactiveContext::is_tracking());
            signal.get();
        });
        assert!(ReactiveContext::is_tracking());

        assert!(ctx.finish().is_empty());
        assert_eq!(signal.subscriber_count(), 0);
    }
}
