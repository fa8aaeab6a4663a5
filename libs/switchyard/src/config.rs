// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Static configuration for async agents and their backends.
//!
//! These values are read once at startup and never mutated afterwards.
//! Every field has a default so partial documents deserialize.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::balancer::BalancerKind;

/// Default decoder name for backend responses.
pub const DEFAULT_ENCODING: &str = "json";

/// Default interval between health probes of a connected agent.
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 10;

/// Free-form per-component configuration, keyed by namespace.
pub type ExtraConfig = Map<String, Value>;

/// One backend definition: where the hosts come from and how to talk to them.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Statically configured hosts. Also the fallback host list when `sd`
    /// names a subscriber that is not registered.
    #[serde(rename = "host")]
    pub hosts: Vec<String>,

    /// Name of the subscriber (service discovery) strategy.
    pub sd: String,

    /// Balancing strategy used to pick one host per call.
    pub lb: BalancerKind,

    /// Seed for the random balancer. `None` seeds from the OS.
    pub lb_seed: Option<u64>,

    /// Path appended to the selected host.
    pub url_pattern: String,

    /// HTTP method used against the backend.
    pub method: String,

    /// Name of the decoder for response bodies.
    pub encoding: String,

    /// Wraps array responses under a `collection` key.
    pub is_collection: bool,

    pub extra_config: ExtraConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            sd: String::new(),
            lb: BalancerKind::default(),
            lb_seed: None,
            url_pattern: String::from("/"),
            method: String::from("GET"),
            encoding: String::from(DEFAULT_ENCODING),
            is_collection: false,
            extra_config: ExtraConfig::new(),
        }
    }
}

/// Connection policy of an agent.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum number of connection attempts. Zero or negative retries
    /// forever.
    pub max_retries: i64,

    /// Name of the backoff strategy between attempts.
    pub backoff_strategy: String,

    /// Interval between health probes once connected, in seconds.
    pub health_interval_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_strategy: String::new(),
            health_interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
        }
    }
}

impl ConnectionConfig {
    /// Retry budget with non-positive values normalized to "forever".
    ///
    /// "Forever" is `u64::MAX` rather than a separate state, so the attempt
    /// counter can be compared against it directly.
    pub fn normalized_max_retries(&self) -> u64 {
        u64::try_from(self.max_retries)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(u64::MAX)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.max(1))
    }
}

/// One configured async agent.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name. Missing names are replaced by `AsyncAgent-NN`.
    pub name: Option<String>,

    pub backend: Vec<BackendConfig>,

    pub connection: ConnectionConfig,

    pub extra_config: ExtraConfig,
}

/// Default label for the agent at position `index`.
pub fn default_agent_name(index: usize) -> String {
    format!("AsyncAgent-{:02}", index)
}

/// Descriptor handed to a proxy factory: everything needed to reach the
/// agent's backends.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointConfig {
    pub name: String,
    pub backend: Vec<BackendConfig>,
    pub extra_config: ExtraConfig,
}

impl EndpointConfig {
    /// Materializes the endpoint for `agent` under the resolved `name`.
    pub fn for_agent(name: &str, agent: &AgentConfig) -> Self {
        Self {
            name: name.to_string(),
            backend: agent.backend.clone(),
            extra_config: agent.extra_config.clone(),
        }
    }
}
