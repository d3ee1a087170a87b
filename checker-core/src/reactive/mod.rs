//! Reactive Primitives
//!
//! This module implements the reactive engine: signals, memos, effects and
//! asynchronous computeds. Everything else in the crate is built on it.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal
//! registers that context as a dependent. When the signal is written, all
//! dependents are notified synchronously, in registration order.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It is computed once on
//! creation and again on the first read after any dependency changed.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change, for example to persist state.
//!
//! ## Async computeds
//!
//! An [`AsyncComputed`] tracks its dependencies synchronously and publishes
//! the output of the future it returns once that future resolves.
//!
//! # Implementation Notes
//!
//! Dependencies are detected through a thread-local tracking context: when
//! a source is read, it checks for a running computation and, if there is
//! one, subscribes it. [`untracked`] suspends this for a closure.

mod context;
mod effect;
mod memo;
mod resource;
mod runtime;
mod signal;
mod subscriber;

pub use context::{untracked, ReactiveContext};
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use resource::AsyncComputed;
pub use runtime::Runtime;
pub use signal::Signal;
pub use subscriber::{Source, SourceId, Subscriber, SubscriberId};
