//! Observable value with get / set / subscribe.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Shared<T> {
    value: T,
    subscribers: BTreeMap<u64, Callback<T>>,
    next_id: u64,
}

/// A value that notifies subscribers whenever it is set.
///
/// Cloning yields another handle to the same value.
pub struct Writable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Writable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Writable<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value,
                subscribers: BTreeMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Replace the value and notify every subscriber.
    pub fn set(&self, value: T) {
        let (value, callbacks) = {
            let mut shared = self.lock();
            shared.value = value;
            let callbacks: Vec<Callback<T>> = shared.subscribers.values().cloned().collect();
            (shared.value.clone(), callbacks)
        };
        // Called without the lock so callbacks may read or set the store.
        for callback in callbacks {
            callback(&value);
        }
    }

    /// Set the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.lock().value);
        self.set(next);
    }

    /// Register a callback. It runs immediately with the current value and
    /// again after every `set` until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let (id, current) = {
            let mut shared = self.lock();
            let id = shared.next_id;
            shared.next_id += 1;
            shared.subscribers.insert(id, Arc::clone(&callback));
            (id, shared.value.clone())
        };
        callback(&current);

        let weak: Weak<Mutex<Shared<T>>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .subscribers
                    .remove(&id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone + Send + std::fmt::Debug + 'static> std::fmt::Debug for Writable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writable")
            .field("value", &self.lock().value)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Disposer returned by `subscribe`. Unsubscribes when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(dispose: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        self.dispose_now();
    }

    fn dispose_now(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
