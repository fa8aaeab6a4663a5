// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Wait durations between connection attempts.
//!
//! A [`Backoff`] maps a retry number (1 for the first retry) to the time to
//! wait before making it. Strategies are selected by name through a
//! [`BackoffRegistry`]; an unknown name yields the constant default.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::registry::Registry;

/// Maps a retry number to the wait before that retry.
pub type Backoff = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Builds a [`Backoff`], optionally seeding its jitter source.
pub type BackoffFactory = Arc<dyn Fn(Option<u64>) -> Backoff + Send + Sync>;

/// Wait used by the default strategy.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound for every growing strategy.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub const CONSTANT: &str = "constant";
pub const FALLBACK: &str = "fallback";
pub const LINEAR: &str = "linear";
pub const LINEAR_JITTER: &str = "linear-jitter";
pub const EXPONENTIAL: &str = "exponential";
pub const EXPONENTIAL_JITTER: &str = "exponential-jitter";
pub const DECORRELATED_JITTER: &str = "decorrelated-jitter";

/// Always waits [`DEFAULT_BACKOFF`].
pub fn constant() -> Backoff {
    Arc::new(|_: u32| DEFAULT_BACKOFF)
}

/// Waits `n` seconds before retry `n`.
pub fn linear() -> Backoff {
    Arc::new(linear_base)
}

/// Waits between `n` and `2n` seconds before retry `n`.
pub fn linear_jitter(seed: Option<u64>) -> Backoff {
    let rng = jitter_source(seed);
    Arc::new(move |n: u32| {
        let base = linear_base(n);
        (base + jitter(&rng, base)).min(MAX_BACKOFF)
    })
}

/// Waits `2^n` seconds before retry `n`.
pub fn exponential() -> Backoff {
    Arc::new(exponential_base)
}

/// Waits between `2^(n-1)` and `2^n` seconds before retry `n`.
pub fn exponential_jitter(seed: Option<u64>) -> Backoff {
    let rng = jitter_source(seed);
    Arc::new(move |n: u32| {
        let half = exponential_base(n) / 2;
        half + jitter(&rng, half)
    })
}

/// Each wait is drawn between [`DEFAULT_BACKOFF`] and three times the
/// previous wait, capped at [`MAX_BACKOFF`].
pub fn decorrelated_jitter(seed: Option<u64>) -> Backoff {
    let rng = jitter_source(seed);
    let previous = Mutex::new(DEFAULT_BACKOFF);
    Arc::new(move |_: u32| {
        let mut previous = previous
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let upper = previous.saturating_mul(3).min(MAX_BACKOFF);
        let spread = upper.saturating_sub(DEFAULT_BACKOFF);
        let next = (DEFAULT_BACKOFF + jitter(&rng, spread)).min(MAX_BACKOFF);
        *previous = next;
        next
    })
}

fn linear_base(n: u32) -> Duration {
    Duration::from_secs(u64::from(n)).min(MAX_BACKOFF)
}

fn exponential_base(n: u32) -> Duration {
    1u64.checked_shl(n)
        .map(Duration::from_secs)
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}

fn jitter_source(seed: Option<u64>) -> Mutex<StdRng> {
    Mutex::new(match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    })
}

/// A uniformly random duration in `[0, upper)`.
fn jitter(rng: &Mutex<StdRng>, upper: Duration) -> Duration {
    let upper_ms = u64::try_from(upper.as_millis()).unwrap_or(u64::MAX);
    if upper_ms == 0 {
        return Duration::ZERO;
    }
    let ms = rng
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .random_range(0..upper_ms);
    Duration::from_millis(ms)
}

/// Backoff strategies keyed by name.
pub struct BackoffRegistry {
    strategies: Registry<BackoffFactory>,
}

impl Default for BackoffRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BackoffRegistry {
    /// A registry with no strategies; every lookup falls back to
    /// [`constant`].
    pub fn empty() -> Self {
        Self {
            strategies: Registry::new(),
        }
    }

    /// A registry preloaded with the built-in strategies.
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        registry.register(CONSTANT, Arc::new(|_: Option<u64>| constant()));
        registry.register(FALLBACK, Arc::new(|_: Option<u64>| constant()));
        registry.register(LINEAR, Arc::new(|_: Option<u64>| linear()));
        registry.register(LINEAR_JITTER, Arc::new(linear_jitter));
        registry.register(EXPONENTIAL, Arc::new(|_: Option<u64>| exponential()));
        registry.register(EXPONENTIAL_JITTER, Arc::new(exponential_jitter));
        registry.register(DECORRELATED_JITTER, Arc::new(decorrelated_jitter));
        registry
    }

    pub fn register(&self, name: &str, factory: BackoffFactory) {
        self.strategies.register(name, factory);
    }

    /// Returns the strategy called `name`, or the constant default.
    pub fn resolve(&self, name: &str, seed: Option<u64>) -> Backoff {
        match self.strategies.get(name) {
            Some(factory) => factory(seed),
            None => {
                if !name.is_empty() {
                    tracing::debug!(strategy = %name, "Unknown backoff strategy, using default");
                }
                constant()
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.strategies.names()
    }
}
