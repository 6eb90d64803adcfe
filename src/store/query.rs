//! Values kept in sync with URL query parameters.
//!
//! A [`QueryStore`] owns the current query string and a registry of bound
//! parameters. URL changes arrive through [`QueryStore::url_changed`], the
//! single notification point; nothing global is patched.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use url::form_urlencoded;

use super::writable::{Subscription, Writable};

type Refresh = Arc<dyn Fn(Option<&str>) + Send + Sync>;

struct Binding {
    key: String,
    refresh: Refresh,
}

struct Registry {
    pairs: Vec<(String, String)>,
    bindings: BTreeMap<u64, Binding>,
    next_id: u64,
    running: bool,
}

impl Registry {
    fn value(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set_value(&mut self, key: &str, value: String) {
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }
}

/// Manager for query-string backed values.
#[derive(Clone)]
pub struct QueryStore {
    registry: Arc<Mutex<Registry>>,
}

impl QueryStore {
    /// Create a stopped store over `query` (with or without a leading `?`).
    pub fn new(query: &str) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                pairs: parse_query(query),
                bindings: BTreeMap::new(),
                next_id: 0,
                running: false,
            })),
        }
    }

    /// Start listening for URL changes. Returns false if already running.
    pub fn start(&self) -> bool {
        let mut registry = self.lock();
        !std::mem::replace(&mut registry.running, true)
    }

    /// Stop listening for URL changes. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let mut registry = self.lock();
        std::mem::replace(&mut registry.running, false)
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Current query string without the leading `?`.
    pub fn query_string(&self) -> String {
        let registry = self.lock();
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(registry.pairs.iter())
            .finish()
    }

    /// Number of bound parameters.
    pub fn binding_count(&self) -> usize {
        self.lock().bindings.len()
    }

    /// Bind a value to query parameter `key`.
    ///
    /// A missing or unparsable parameter reads as `default`. With
    /// `place_on_init`, a missing parameter is written to the query.
    pub fn bind<T>(&self, key: &str, default: T, place_on_init: bool) -> QueryParam<T>
    where
        T: FromStr + Display + Clone + PartialEq + Send + Sync + 'static,
    {
        let mut registry = self.lock();

        let initial = match registry.value(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| default.clone()),
            None => {
                if place_on_init {
                    registry.set_value(key, default.to_string());
                }
                default.clone()
            }
        };

        let value = Writable::new(initial);
        let target = value.clone();
        let fallback = default.clone();
        let refresh: Refresh = Arc::new(move |raw: Option<&str>| {
            let next = raw
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_else(|| fallback.clone());
            target.set(next);
        });

        let id = registry.next_id;
        registry.next_id += 1;
        registry.bindings.insert(
            id,
            Binding {
                key: key.to_string(),
                refresh,
            },
        );

        QueryParam {
            id,
            key: key.to_string(),
            default,
            value,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Report a new URL query. Every bound value is re-read and subscribers
    /// are notified. Ignored while stopped; returns whether it was applied.
    pub fn url_changed(&self, query: &str) -> bool {
        let refreshes: Vec<(Refresh, Option<String>)> = {
            let mut registry = self.lock();
            if !registry.running {
                log::debug!("query store stopped, ignoring URL change");
                return false;
            }
            registry.pairs = parse_query(query);
            registry
                .bindings
                .values()
                .map(|b| (Arc::clone(&b.refresh), registry.value(&b.key).map(str::to_string)))
                .collect()
        };

        for (refresh, raw) in refreshes {
            refresh(raw.as_deref());
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for QueryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStore")
            .field("query", &self.query_string())
            .field("bindings", &self.binding_count())
            .field("running", &self.is_running())
            .finish()
    }
}

/// A value bound to one query parameter. Dropping it deregisters the binding.
pub struct QueryParam<T> {
    id: u64,
    key: String,
    default: T,
    value: Writable<T>,
    registry: Weak<Mutex<Registry>>,
}

impl<T> QueryParam<T>
where
    T: FromStr + Display + Clone + PartialEq + Send + Sync + 'static,
{
    /// Parameter name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Subscribe to changes; see [`Writable::subscribe`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.value.subscribe(callback)
    }

    /// Set the value, update every binding of the same key and write the
    /// query. The query is left untouched when the parameter is absent and
    /// the value equals the default.
    pub fn set(&self, value: T) {
        let Some(registry) = self.registry.upgrade() else {
            self.value.set(value);
            return;
        };

        let raw = value.to_string();
        let refreshes: Vec<Refresh> = {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if registry.value(&self.key).is_some() || value != self.default {
                registry.set_value(&self.key, raw.clone());
            }
            registry
                .bindings
                .values()
                .filter(|b| b.key == self.key)
                .map(|b| Arc::clone(&b.refresh))
                .collect()
        };

        for refresh in refreshes {
            refresh(Some(raw.as_str()));
        }
    }

    /// Set the value computed from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.get());
        self.set(next);
    }
}

impl<T> Drop for QueryParam<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .bindings
                .remove(&self.id);
        }
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}
