// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The per-agent execution context handed to agent factories.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::group::SupervisionGroup;
use crate::backoff::Backoff;
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::logging::Logger;
use crate::proxy::Proxy;

/// Decides whether attempt number `n` may be made.
pub type RetryPredicate = Arc<dyn Fn(u64) -> bool + Send + Sync>;

/// Returns the predicate `n <= max_retries`.
pub fn retry_predicate(max_retries: u64) -> RetryPredicate {
    Arc::new(move |n: u64| n <= max_retries)
}

/// Liveness signal an agent sends on the shared outbound channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentPing {
    pub agent: String,
}

/// Sending half of the shared outbound channel. Agents only ever hold
/// clones of it; the receiver and the decision to close belong to whoever
/// created the channel.
pub type PingSender = mpsc::Sender<AgentPing>;

/// Everything an agent needs to run, built once per agent at startup.
#[derive(Clone)]
pub struct AgentOptions {
    /// Resolved agent name (configured or generated).
    pub name: String,
    pub agent: AgentConfig,
    pub proxy: Arc<dyn Proxy>,
    pub pings: PingSender,
    pub group: SupervisionGroup,
    pub should_retry: RetryPredicate,
    pub backoff: Backoff,
    pub logger: Arc<dyn Logger>,
}

impl AgentOptions {
    /// Sends a liveness ping, waiting for room on a full channel.
    ///
    /// Returns `Ok(false)` when nobody listens anymore and
    /// [`AgentError::Cancelled`] when `cancel` fires while waiting.
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<bool, AgentError> {
        let ping = AgentPing {
            agent: self.name.clone(),
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled(self.name.clone())),
            sent = self.pings.send(ping) => Ok(sent.is_ok()),
        }
    }
}

impl fmt::Debug for AgentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentOptions")
            .field("name", &self.name)
            .field("agent", &self.agent)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}
