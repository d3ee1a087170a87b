//! Consumer bindings.
//!
//! A [`Binding`] is what a UI component holds on to. Every selection or
//! watcher it creates lives exactly as long as the binding: dropping it,
//! whether on a normal teardown or an early exit, disposes all of them.

use std::sync::{Arc, OnceLock};

use crate::reactive::{untracked, Effect, Signal};

/// A consumer's set of live subscriptions to a store view.
pub struct Binding<V> {
    view: V,
    subscriptions: Vec<Effect>,
}

/// The live result of a projection created by [`Binding::select`].
///
/// Reading it inside a computation tracks it like any signal. After the
/// owning binding is torn down it keeps its last value.
#[derive(Clone)]
pub struct Selection<R>
where
    R: Clone + Send + Sync + 'static,
{
    value: Signal<R>,
}

impl<R> Selection<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Current projected value, tracked.
    pub fn get(&self) -> R {
        self.value.get()
    }

    /// Current projected value, untracked.
    pub fn get_untracked(&self) -> R {
        self.value.get_untracked()
    }
}

impl<V> Binding<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Bind to a view.
    pub fn new(view: V) -> Self {
        Self {
            view,
            subscriptions: Vec::new(),
        }
    }

    /// The view this binding reads from.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Project the view. The projection re-runs whenever anything it reads
    /// changes, until the binding is dropped.
    pub fn select<R, F>(&mut self, projection: F) -> Selection<R>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(&V) -> R + Send + Sync + 'static,
    {
        let projection = Arc::new(projection);
        let slot: Arc<OnceLock<Signal<R>>> = Arc::new(OnceLock::new());

        // The first run creates the signal; later runs write into it.
        let effect = {
            let (view, projection, slot) = (self.view.clone(), projection.clone(), slot.clone());
            Effect::new(move || {
                let value = projection(&view);
                match slot.get() {
                    Some(target) => target.set(value),
                    None => {
                        let _ = slot.set(Signal::new(value));
                    }
                }
            })
        };
        self.subscriptions.push(effect);

        let value = match slot.get() {
            Some(value) => value.clone(),
            None => Signal::new(untracked(|| projection(&self.view))),
        };
        Selection { value }
    }

    /// Run `f` now and again whenever anything it reads changes, until the
    /// binding is dropped.
    pub fn watch<F>(&mut self, f: F)
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        let view = self.view.clone();
        self.subscriptions.push(Effect::new(move || f(&view)));
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<V> Drop for Binding<V> {
    fn drop(&mut self) {
        for effect in self.subscriptions.drain(..) {
            effect.dispose();
        }
    }
}
