// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Host discovery.
//!
//! A [`Subscriber`] produces the current host list of a logical backend.
//! [`FixedSubscriber`] serves a static list, [`FnSubscriber`] adapts a
//! closure and [`WatchSubscriber`] follows the latest list published on a
//! `watch` channel by a discovery task. Dynamic strategies are registered by
//! name in a [`SubscriberRegistry`] and picked with [`resolve_subscriber`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::config::BackendConfig;
use crate::error::SubscriberError;
use crate::registry::Registry;

/// An opaque network address.
pub type Host = String;

/// Provider of the current set of backend hosts.
///
/// Implementations must tolerate concurrent and repeated calls. An empty
/// list is a valid answer meaning "no hosts right now".
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn hosts(&self) -> Result<Vec<Host>, SubscriberError>;
}

/// Builds a subscriber for a backend definition.
pub type SubscriberFactory = Arc<dyn Fn(&BackendConfig) -> Arc<dyn Subscriber> + Send + Sync>;

/// Subscriber strategies keyed by their `sd` name.
pub type SubscriberRegistry = Registry<SubscriberFactory>;

/// A subscriber that always returns the same hosts.
#[derive(Debug, Clone)]
pub struct FixedSubscriber {
    hosts: Arc<[Host]>,
}

impl FixedSubscriber {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Host>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Subscriber for FixedSubscriber {
    async fn hosts(&self) -> Result<Vec<Host>, SubscriberError> {
        Ok(self.hosts.to_vec())
    }
}

/// Adapts a function into a [`Subscriber`].
pub struct FnSubscriber<F> {
    f: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn() -> Result<Vec<Host>, SubscriberError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn() -> Result<Vec<Host>, SubscriberError> + Send + Sync,
{
    async fn hosts(&self) -> Result<Vec<Host>, SubscriberError> {
        (self.f)()
    }
}

/// Follows the host list published by a discovery task.
///
/// Each call returns the most recent value. When the publishing side is
/// dropped the last published list keeps being served.
#[derive(Debug, Clone)]
pub struct WatchSubscriber {
    rx: watch::Receiver<Vec<Host>>,
}

impl WatchSubscriber {
    pub fn new(rx: watch::Receiver<Vec<Host>>) -> Self {
        Self { rx }
    }

    /// Creates the subscriber together with the sender a discovery task
    /// publishes into.
    pub fn channel(initial: Vec<Host>) -> (watch::Sender<Vec<Host>>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Subscriber for WatchSubscriber {
    async fn hosts(&self) -> Result<Vec<Host>, SubscriberError> {
        Ok(self.rx.borrow().clone())
    }
}

/// Returns the subscriber for `backend`.
///
/// The strategy named by `backend.sd` is looked up in `registry`. When the
/// name is empty or unknown the backend's static host list is used.
pub fn resolve_subscriber(
    registry: &SubscriberRegistry,
    backend: &BackendConfig,
) -> Arc<dyn Subscriber> {
    match registry.get(&backend.sd) {
        Some(factory) => factory(backend),
        None => {
            if !backend.sd.is_empty() {
                tracing::debug!(
                    sd = %backend.sd,
                    "Unknown subscriber strategy, using static hosts"
                );
            }
            Arc::new(FixedSubscriber::new(backend.hosts.iter().cloned()))
        }
    }
}
