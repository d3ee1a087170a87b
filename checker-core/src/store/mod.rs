//! Stores
//!
//! A store is a named bundle of reactive fields plus the method set that is
//! allowed to mutate them. Consumers only ever see a read-only view.
//!
//! # Fields
//!
//! Fields are declared through a [`StateMap`] and come in two kinds:
//!
//! - mutable: a signal. It is persisted and seeded back from storage when
//!   the store is constructed.
//! - derived: a memo. It is included in persisted snapshots but never
//!   seeded; it is always recomputed from the mutable fields.
//!
//! Field handles stay inside the crate. Outside it a store's state can only
//! be read through its view or its snapshot, and only written through its
//! methods.
//!
//! # Persistence
//!
//! A persisted store reads the snapshot under `store:<name>` once at
//! construction. Unreadable or malformed snapshots count as empty, and
//! entries that no longer fit their field are skipped. It then installs one
//! effect per mutable field that rewrites the whole snapshot every time
//! that field is written. There is no batching.

mod binding;
mod storage;

pub use binding::{Binding, Selection};
pub use storage::{load_json, FileStorage, MemoryStorage, Storage};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::reactive::{Effect, Memo, Signal};

/// A field that can be observed and serialized.
pub(crate) trait ObservableField: Send + Sync {
    /// Register the field as a dependency of the running computation.
    fn track(&self);

    /// Serialize the current value without tracking it.
    fn to_json(&self) -> Result<Value, serde_json::Error>;
}

/// A field that can also be restored from a serialized value.
pub(crate) trait MutableField: ObservableField {
    /// Replace the current value with a deserialized one.
    fn seed(&self, value: Value) -> Result<(), serde_json::Error>;
}

impl<T> ObservableField for Signal<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    fn track(&self) {
        Signal::track(self);
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        self.with_untracked(|value| serde_json::to_value(value))
    }
}

impl<T> MutableField for Signal<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn seed(&self, value: Value) -> Result<(), serde_json::Error> {
        self.set(serde_json::from_value(value)?);
        Ok(())
    }
}

impl<T> ObservableField for Memo<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    fn track(&self) {
        self.get();
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.get_untracked())
    }
}

/// A named store field.
#[derive(Clone)]
pub(crate) enum Field {
    /// Writable state, persisted and restored.
    Mutable(Arc<dyn MutableField>),
    /// Derived state, persisted but never restored.
    Derived(Arc<dyn ObservableField>),
}

impl Field {
    fn observable(&self) -> &dyn ObservableField {
        match self {
            Field::Mutable(field) => field.as_ref(),
            Field::Derived(field) => field.as_ref(),
        }
    }
}

/// Named fields of a store, in declaration order.
#[derive(Clone, Default)]
pub struct StateMap {
    fields: IndexMap<&'static str, Field>,
}

impl StateMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a writable field.
    pub fn mutable<T>(mut self, name: &'static str, signal: &Signal<T>) -> Self
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.fields
            .insert(name, Field::Mutable(Arc::new(signal.clone())));
        self
    }

    /// Declare a derived, read-only field.
    pub fn derived<T>(mut self, name: &'static str, memo: &Memo<T>) -> Self
    where
        T: Serialize + Clone + Send + Sync + 'static,
    {
        self.fields
            .insert(name, Field::Derived(Arc::new(memo.clone())));
        self
    }

    /// Look up a field by name.
    pub(crate) fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize every field. Fields that fail to serialize are left out.
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut snapshot = Map::new();
        for (name, field) in &self.fields {
            match field.observable().to_json() {
                Ok(value) => {
                    snapshot.insert((*name).to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(field = name, error = %err, "field is not serializable, leaving it out");
                }
            }
        }
        snapshot
    }
}

/// The method set of a store.
///
/// Methods own the write side of the store's signals and hand out a
/// read-only view of them.
pub trait StoreMethods {
    /// Read-only projection of the store's state.
    type View: Clone + Send + Sync + 'static;

    /// Build the read-only view.
    fn view(&self) -> Self::View;
}

/// A named bundle of state and methods, optionally persisted.
pub struct Store<M> {
    name: String,
    fields: Arc<StateMap>,
    methods: M,
    persistence: Vec<Effect>,
}

impl<M> Store<M>
where
    M: StoreMethods,
{
    /// Create an in-memory store.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce() -> (StateMap, M),
    {
        let (fields, methods) = factory();
        Self {
            name: name.into(),
            fields: Arc::new(fields),
            methods,
            persistence: Vec::new(),
        }
    }

    /// Create a store that restores its mutable fields from `storage` and
    /// writes every change back.
    pub fn persisted<F>(name: impl Into<String>, storage: Arc<dyn Storage>, factory: F) -> Self
    where
        F: FnOnce() -> (StateMap, M),
    {
        let mut store = Self::new(name, factory);
        let key = Self::snapshot_key(&store.name);

        seed_fields(&store.fields, storage.as_ref(), &key);

        store.persistence = store
            .fields
            .names()
            .filter_map(|name| match store.fields.get(name) {
                Some(Field::Mutable(field)) => Some(persist_on_change(
                    field.clone(),
                    store.fields.clone(),
                    storage.clone(),
                    key.clone(),
                )),
                _ => None,
            })
            .collect();

        tracing::debug!(
            store = %store.name,
            fields = store.fields.len(),
            persisted = store.persistence.len(),
            "store ready"
        );
        store
    }

    /// Storage key of the snapshot for a store called `name`.
    pub fn snapshot_key(name: &str) -> String {
        format!("store:{name}")
    }

    /// The store's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store's methods, the only way to mutate its state.
    pub fn methods(&self) -> &M {
        &self.methods
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> M::View {
        self.methods.view()
    }

    /// The declared fields. Only their names and serialized values are
    /// visible outside the crate; a field cannot be written through them.
    ///
    /// ```compile_fail
    /// use checker_core::store::Store;
    /// use checker_core::Workflow;
    ///
    /// fn overwrite(store: &Store<Workflow>) {
    ///     let _ = store.fields().get("text");
    /// }
    /// ```
    pub fn fields(&self) -> &StateMap {
        &self.fields
    }

    /// Serialize the full current state, derived fields included.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.fields.snapshot()
    }

    /// Create a consumer binding over this store's view.
    pub fn bind(&self) -> Binding<M::View> {
        Binding::new(self.state())
    }
}

fn seed_fields(fields: &StateMap, storage: &dyn Storage, key: &str) {
    let mut snapshot: Map<String, Value> = load_json(storage, key);

    for name in fields.names() {
        let Some(value) = snapshot.remove(name) else {
            continue;
        };
        match fields.get(name) {
            Some(Field::Mutable(field)) => {
                if let Err(err) = field.seed(value) {
                    tracing::warn!(field = name, error = %err, "persisted value does not fit field, keeping default");
                }
            }
            Some(Field::Derived(_)) => {
                tracing::debug!(field = name, "not restoring derived field");
            }
            None => {}
        }
    }

    for name in snapshot.keys() {
        tracing::debug!(field = %name, "ignoring unknown persisted field");
    }
}

fn persist_on_change(
    field: Arc<dyn MutableField>,
    fields: Arc<StateMap>,
    storage: Arc<dyn Storage>,
    key: String,
) -> Effect {
    // The first run only subscribes; the seeded state is already stored.
    let primed = AtomicBool::new(false);
    Effect::new(move || {
        field.track();
        if !primed.swap(true, Ordering::SeqCst) {
            return;
        }
        write_snapshot(&fields, storage.as_ref(), &key);
    })
}

fn write_snapshot(fields: &StateMap, storage: &dyn Storage, key: &str) {
    let result = serde_json::to_string(&fields.snapshot())
        .map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })
        .and_then(|json| storage.set(key, json));

    if let Err(err) = result {
        tracing::warn!(key, error = %err, "could not persist store snapshot");
    }
}

impl<M> Drop for Store<M> {
    fn drop(&mut self) {
        for effect in self.persistence.drain(..) {
            effect.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;

    #[derive(Clone)]
    struct Counter {
        count: Signal<i64>,
        label: Signal<String>,
        doubled: Memo<i64>,
    }

    impl Counter {
        fn factory() -> (StateMap, Counter) {
            let count = Signal::new(0);
            let label = Signal::new("counter".to_string());
            let c = count.clone();
            let doubled = Memo::new(move || c.get() * 2);

            let fields = StateMap::new()
                .mutable("count", &count)
                .mutable("label", &label)
                .derived("doubled", &doubled);
            (fields, Counter { count, label, doubled })
        }

        fn increment(&self) {
            self.count.update(|n| *n += 1);
        }
    }

    impl StoreMethods for Counter {
        type View = Counter;

        fn view(&self) -> Counter {
            self.clone()
        }
    }

    fn stored(storage: &MemoryStorage, name: &str) -> Map<String, Value> {
        let raw = storage
            .get(&Store::<Counter>::snapshot_key(name))
            .unwrap()
            .unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn every_write_persists_full_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::persisted("counter", storage.clone(), Counter::factory);
        assert!(storage.is_empty());

        store.methods().increment();
        let snapshot = stored(&storage, "counter");
        assert_eq!(snapshot["count"], 1);
        assert_eq!(snapshot["label"], "counter");
        assert_eq!(snapshot["doubled"], 2);
    }

    #[test]
    fn reconstruction_restores_mutable_fields_only() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                "store:counter",
                r#"{"count": 4, "label": "restored", "doubled": 1000, "gone": true}"#.into(),
            )
            .unwrap();

        let store = Store::persisted("counter", storage.clone(), Counter::factory);
        let state = store.state();
        assert_eq!(state.count.get(), 4);
        assert_eq!(state.label.get(), "restored");
        assert_eq!(state.doubled.get(), 8);
    }

    #[test]
    fn malformed_snapshot_falls_back_to_defaults() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("store:counter", "{\"count\": ".into()).unwrap();

        let store = Store::persisted("counter", storage.clone(), Counter::factory);
        assert_eq!(store.state().count.get(), 0);

        // A wrongly typed entry is skipped without affecting the others.
        storage
            .set("store:other", r#"{"count": "many", "label": "ok"}"#.into())
            .unwrap();
        let other = Store::persisted("other", storage, Counter::factory);
        assert_eq!(other.state().count.get(), 0);
        assert_eq!(other.state().label.get(), "ok");
    }

    #[test]
    fn dropped_store_stops_persisting() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::persisted("counter", storage.clone(), Counter::factory);
        let state = store.state();
        store.methods().increment();
        drop(store);

        state.count.set(10);
        assert_eq!(stored(&storage, "counter")["count"], 1);
    }

    #[test]
    fn in_memory_store_has_no_persistence() {
        let store = Store::new("counter", Counter::factory);
        store.methods().increment();
        assert_eq!(store.snapshot()["count"], 1);
        assert_eq!(store.name(), "counter");
        assert_eq!(store.fields().len(), 3);
    }
}
