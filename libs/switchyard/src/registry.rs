// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Name-to-value lookup tables for pluggable strategies.
//!
//! Subscribers, backoff strategies and decoders are all resolved by a name
//! taken from configuration. A [`Registry`] holds those values; a
//! [`NamespacedRegistry`] partitions several registries under a namespace
//! key. Registries are plain values: the composition root builds them and
//! hands out `Arc` references, there is no process-wide instance.
//!
//! Writes are expected at startup, reads at resolution time, so both types
//! sit behind a [`RwLock`]. A lookup miss is never an error; callers pick
//! their own fallback.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A concurrency-safe, append-mostly map from names to values.
///
/// The last [`register`](Registry::register) for a name wins. There is no
/// removal.
#[derive(Debug)]
pub struct Registry<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Default for Registry<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> Registry<V> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, replacing any previous value.
    pub fn register(&self, name: impl Into<String>, value: V) {
        write(&self.entries).insert(name.into(), value);
    }

    /// Returns a clone of the value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<V> {
        read(&self.entries).get(name).cloned()
    }

    /// Returns every registered name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.entries).keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    /// Returns true when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        read(&self.entries).is_empty()
    }
}

/// A set of [`Registry`] instances keyed by namespace.
///
/// A namespace is created by its first write. Reading a namespace that has
/// never been written returns `None`.
#[derive(Debug)]
pub struct NamespacedRegistry<V> {
    namespaces: RwLock<HashMap<String, Arc<Registry<V>>>>,
}

impl<V> Default for NamespacedRegistry<V> {
    fn default() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> NamespacedRegistry<V> {
    /// Creates an empty namespaced registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name` inside `namespace`, creating the namespace
    /// when needed.
    pub fn register(&self, namespace: &str, name: impl Into<String>, value: V) {
        if let Some(registry) = read(&self.namespaces).get(namespace) {
            registry.register(name, value);
            return;
        }

        // Another writer may have created the namespace between the two locks.
        let registry = Arc::clone(
            write(&self.namespaces)
                .entry(namespace.to_string())
                .or_default(),
        );
        registry.register(name, value);
    }

    /// Returns the registry for `namespace`, if it has been written to.
    pub fn get(&self, namespace: &str) -> Option<Arc<Registry<V>>> {
        read(&self.namespaces).get(namespace).map(Arc::clone)
    }

    /// Convenience lookup of `name` inside `namespace`.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<V> {
        self.get(namespace).and_then(|registry| registry.get(name))
    }
}

// A panic while holding the lock cannot leave a HashMap half-written in a
// way that matters here, so poisoning is ignored rather than surfaced.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
