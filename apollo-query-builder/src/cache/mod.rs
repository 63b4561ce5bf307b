use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

type WaitMap<K, V, E> = Arc<Mutex<HashMap<K, broadcast::Sender<Result<V, E>>>>>;

/// A cache where at most one caller computes the value of a missing key.
///
/// The first caller asking for a missing key gets a [`Entry::is_first`] entry and is expected
/// to compute the value, then [`Entry::insert`] it or report an [`Entry::error`]. Concurrent
/// callers for that key wait on the first one. Values never expire, errors are never stored.
#[derive(Clone)]
pub(crate) struct DeduplicatingCache<K: Clone + Eq + Hash, V: Clone, E: Clone> {
    wait_map: WaitMap<K, V, E>,
    storage: Arc<DashMap<K, V>>,
}

impl<K, V, E> DeduplicatingCache<K, V, E>
where
    K: Clone + Eq + Hash,
    V: Clone,
    E: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            wait_map: Arc::new(Mutex::new(HashMap::new())),
            storage: Arc::new(DashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Entry<K, V, E> {
        // values are never removed, a hit does not need the wait map
        if let Some(value) = self.storage.get(key) {
            return Entry {
                inner: EntryInner::Value(value.value().clone()),
            };
        }

        let mut locked_wait_map = self.wait_map.lock();
        if let Some(waiter) = locked_wait_map.get(key) {
            // Register interest in key
            return Entry {
                inner: EntryInner::Receiver {
                    receiver: waiter.subscribe(),
                },
            };
        }

        // checked under the lock: a first caller stores its value before leaving the wait map
        if let Some(value) = self.storage.get(key) {
            return Entry {
                inner: EntryInner::Value(value.value().clone()),
            };
        }

        let (sender, _receiver) = broadcast::channel(1);
        locked_wait_map.insert(key.clone(), sender.clone());
        Entry {
            inner: EntryInner::First {
                storage: self.storage.clone(),
                guard: WaitGuard {
                    key: key.clone(),
                    sender,
                    wait_map: self.wait_map.clone(),
                },
            },
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.storage.len()
    }
}

/// Outcome of waiting on another caller's computation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WaitError<E> {
    /// The first caller reported this error.
    Failed(E),
    /// The first caller went away without a result. Asking again makes a new first caller.
    Abandoned,
}

pub(crate) struct Entry<K: Clone + Eq + Hash, V: Clone, E: Clone> {
    inner: EntryInner<K, V, E>,
}

enum EntryInner<K: Clone + Eq + Hash, V: Clone, E: Clone> {
    First {
        storage: Arc<DashMap<K, V>>,
        guard: WaitGuard<K, V, E>,
    },
    Receiver {
        receiver: broadcast::Receiver<Result<V, E>>,
    },
    Value(V),
}

/// Removes the wait map entry of a first caller, however it finishes.
struct WaitGuard<K: Clone + Eq + Hash, V: Clone, E: Clone> {
    key: K,
    sender: broadcast::Sender<Result<V, E>>,
    wait_map: WaitMap<K, V, E>,
}

impl<K: Clone + Eq + Hash, V: Clone, E: Clone> Drop for WaitGuard<K, V, E> {
    fn drop(&mut self) {
        let mut locked_wait_map = self.wait_map.lock();
        if locked_wait_map
            .get(&self.key)
            .is_some_and(|sender| sender.same_channel(&self.sender))
        {
            locked_wait_map.remove(&self.key);
        }
    }
}

impl<K, V, E> Entry<K, V, E>
where
    K: Clone + Eq + Hash,
    V: Clone,
    E: Clone,
{
    pub(crate) fn is_first(&self) -> bool {
        matches!(self.inner, EntryInner::First { .. })
    }

    /// Waits for the value. A first entry has nothing to wait for and reports itself abandoned.
    pub(crate) async fn get(self) -> Result<V, WaitError<E>> {
        match self.inner {
            // there was already a value in cache
            EntryInner::Value(v) => Ok(v),
            EntryInner::Receiver { mut receiver } => match receiver.recv().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(WaitError::Failed(error)),
                Err(_) => Err(WaitError::Abandoned),
            },
            EntryInner::First { .. } => Err(WaitError::Abandoned),
        }
    }

    pub(crate) fn insert(self, value: V) {
        if let EntryInner::First { storage, guard } = self.inner {
            storage.insert(guard.key.clone(), value.clone());
            let sender = guard.sender.clone();
            drop(guard);
            let _ = sender.send(Ok(value));
        }
    }

    pub(crate) fn error(self, error: E) {
        if let EntryInner::First { guard, .. } = self.inner {
            let sender = guard.sender.clone();
            drop(guard);
            let _ = sender.send(Err(error));
        }
    }
}
