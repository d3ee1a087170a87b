//! Asynchronous computed values.
//!
//! An [`AsyncComputed`] is an effect whose body produces a future. The
//! synchronous part of the body runs inside the tracking context, so every
//! source it reads becomes a dependency; the returned future is then
//! spawned and its output written into a target signal once it resolves.
//!
//! Runs are never cancelled. When dependencies change faster than the
//! futures resolve, several runs are in flight at once and they may finish
//! in any order: whichever resolves last determines the final value, even
//! if it was started first.

use std::future::Future;
use std::sync::Arc;
use std::thread;

use futures::FutureExt;
use tokio::sync::watch;

use super::effect::Effect;
use super::signal::Signal;

/// A derived value computed by an asynchronous function.
pub struct AsyncComputed<T>
where
    T: Clone + Send + Sync + 'static,
{
    value: Signal<T>,
    effect: Effect,
    in_flight: Arc<watch::Sender<usize>>,
}

impl<T> AsyncComputed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an async computed holding `initial` until its first run
    /// resolves.
    pub fn new<F, Fut>(initial: T, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::with_target(Signal::new(initial), fetch)
    }

    /// Create an async computed that writes its results into an existing
    /// signal. Other writers may still set the signal between runs.
    pub fn with_target<F, Fut>(target: Signal<T>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (in_flight, _) = watch::channel(0usize);
        let in_flight = Arc::new(in_flight);

        let effect = {
            let target = target.clone();
            let in_flight = in_flight.clone();
            Effect::new(move || {
                let future = fetch();
                let target = target.clone();
                let guard = InFlight::start(in_flight.clone());
                spawn(async move {
                    let _guard = guard;
                    target.set(future.await);
                });
            })
        };

        Self {
            value: target,
            effect,
            in_flight,
        }
    }

    /// Latest resolved value, tracked.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Latest resolved value, untracked.
    pub fn get_untracked(&self) -> T {
        self.value.get_untracked()
    }

    /// Whether any run has not resolved yet.
    pub fn is_pending(&self) -> bool {
        *self.in_flight.borrow() > 0
    }

    /// Wait until every run started so far has resolved.
    pub async fn settled(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender is owned by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Number of runs started.
    pub fn run_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Stop reacting to dependency changes. Runs already in flight still
    /// write their results.
    pub fn dispose(&self) {
        self.effect.dispose();
    }
}

/// Counts a run as in flight until dropped.
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn start(counter: Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|count| *count += 1);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Spawn on the ambient tokio runtime. Without one, poll the task once
/// right here; a task that is still pending finishes on its own thread.
///
/// The caller may itself be running inside an executor, so no executor is
/// entered on this thread.
fn spawn<Fut>(task: Fut)
where
    Fut: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
        return;
    }

    let mut task = Box::pin(task);
    if task.as_mut().now_or_never().is_some() {
        return;
    }
    tracing::trace!("no tokio runtime, finishing async computed on a helper thread");
    thread::spawn(move || futures::executor::block_on(task));
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn resolves_into_value() {
        let input = Signal::new(2);

        let i = input.clone();
        let computed = AsyncComputed::new(0, move || {
            let n = i.get();
            async move { n * 10 }
        });

        computed.settled().await;
        assert_eq!(computed.get(), 20);

        input.set(3);
        computed.settled().await;
        assert_eq!(computed.get(), 30);
        assert_eq!(computed.run_count(), 2);
    }

    #[test]
    fn resolves_inline_without_runtime() {
        let input = Signal::new(1);

        let i = input.clone();
        let computed = AsyncComputed::new(0, move || {
            let n = i.get();
            async move { n + 1 }
        });
        assert_eq!(computed.get(), 2);

        input.set(5);
        assert_eq!(computed.get(), 6);
        assert!(!computed.is_pending());
    }

    #[test]
    fn resolves_inline_inside_a_foreign_executor() {
        let input = Signal::new(1);

        let i = input.clone();
        let computed = AsyncComputed::new(0, move || {
            let n = i.get();
            async move { n + 1 }
        });

        futures::executor::block_on(async { input.set(4) });
        assert_eq!(computed.get(), 5);
    }

    #[test]
    fn pending_run_without_runtime_finishes_later() {
        let (tx, rx) = oneshot::channel::<i32>();
        let gate = Mutex::new(Some(rx));

        let computed = AsyncComputed::new(0, move || {
            let rx = gate.lock().take();
            async move {
                match rx {
                    Some(rx) => rx.await.unwrap_or(-1),
                    None => -1,
                }
            }
        });
        assert!(computed.is_pending());

        tx.send(7).unwrap();
        futures::executor::block_on(computed.settled());
        assert_eq!(computed.get(), 7);
    }

    #[tokio::test]
    async fn late_resolution_overwrites_newer_value() {
        let input = Signal::new(0);
        let gates: Arc<Mutex<Vec<oneshot::Sender<i32>>>> = Arc::new(Mutex::new(Vec::new()));

        let (i, g) = (input.clone(), gates.clone());
        let computed = AsyncComputed::new(-1, move || {
            let n = i.get();
            let (tx, rx) = oneshot::channel();
            g.lock().push(tx);
            async move { rx.await.unwrap_or(n) }
        });

        input.set(1);
        assert!(computed.is_pending());

        let mut senders: Vec<_> = gates.lock().drain(..).collect();
        let first = senders.remove(0);
        let second = senders.remove(0);

        // The newer run resolves first...
        let _ = second.send(1);
        while computed.get_untracked() != 1 {
            tokio::task::yield_now().await;
        }

        // ...then the older one lands and wins.
        let _ = first.send(0);
        computed.settled().await;
        assert_eq!(computed.get(), 0);
    }

    #[tokio::test]
    async fn disposed_computed_stops_running() {
        let input = Signal::new(1);

        let i = input.clone();
        let computed = AsyncComputed::new(0, move || {
            let n = i.get();
            async move { n }
        });
        computed.settled().await;

        computed.dispose();
        input.set(9);
        computed.settled().await;
        assert_eq!(computed.get(), 1);
    }
}
