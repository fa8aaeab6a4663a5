// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Per-call host selection.
//!
//! Both balancers ask their [`Subscriber`] for the host list on every call,
//! so topology changes are picked up without a restart. Nothing is cached.
//! When the list length changes between calls the round-robin index simply
//! wraps against the new length; the resulting skew during churn is
//! accepted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::error::BalancerError;
use crate::subscriber::{Host, Subscriber};

/// Picks exactly one host per call.
#[async_trait]
pub trait Balancer: Send + Sync {
    async fn host(&self) -> Result<Host, BalancerError>;
}

/// Available balancing strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerKind {
    #[default]
    #[serde(alias = "roundrobin")]
    RoundRobin,
    Random,
}

/// Builds the balancer of `kind` over `subscriber`.
///
/// `seed` only matters for [`BalancerKind::Random`]; `None` seeds from the
/// operating system.
pub fn new_balancer(
    kind: BalancerKind,
    subscriber: Arc<dyn Subscriber>,
    seed: Option<u64>,
) -> Arc<dyn Balancer> {
    match kind {
        BalancerKind::RoundRobin => Arc::new(RoundRobinBalancer::new(subscriber)),
        BalancerKind::Random => match seed {
            Some(seed) => Arc::new(RandomBalancer::with_seed(subscriber, seed)),
            None => Arc::new(RandomBalancer::new(subscriber)),
        },
    }
}

/// Cycles through the hosts using one counter shared by all callers.
pub struct RoundRobinBalancer {
    subscriber: Arc<dyn Subscriber>,
    counter: AtomicU64,
}

impl RoundRobinBalancer {
    pub fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self {
            subscriber,
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Balancer for RoundRobinBalancer {
    async fn host(&self) -> Result<Host, BalancerError> {
        let hosts = self.subscriber.hosts().await?;
        if hosts.is_empty() {
            return Err(BalancerError::NoHostsAvailable);
        }

        let offset = self.counter.fetch_add(1, Ordering::Relaxed);
        // usize -> u64 is lossless on every supported target.
        let index = offset % hosts.len() as u64;
        let index = usize::try_from(index).map_err(|_| BalancerError::NoHostsAvailable)?;
        hosts
            .into_iter()
            .nth(index)
            .ok_or(BalancerError::NoHostsAvailable)
    }
}

/// Picks a uniformly random host from a privately seeded generator.
pub struct RandomBalancer {
    subscriber: Arc<dyn Subscriber>,
    rng: Mutex<StdRng>,
}

impl RandomBalancer {
    /// Seeds the generator from the operating system.
    pub fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self {
            subscriber,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Same seed and same host lists give the same selections.
    pub fn with_seed(subscriber: Arc<dyn Subscriber>, seed: u64) -> Self {
        Self {
            subscriber,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl Balancer for RandomBalancer {
    async fn host(&self) -> Result<Host, BalancerError> {
        let hosts = self.subscriber.hosts().await?;
        if hosts.is_empty() {
            return Err(BalancerError::NoHostsAvailable);
        }

        let index = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .random_range(0..hosts.len());
        hosts
            .into_iter()
            .nth(index)
            .ok_or(BalancerError::NoHostsAvailable)
    }
}
