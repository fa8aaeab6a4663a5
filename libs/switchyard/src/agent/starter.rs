// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Turns the configured agent list into supervised workers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::group::SupervisionGroup;
use crate::agent::options::{AgentOptions, PingSender, retry_predicate};
use crate::backoff::BackoffRegistry;
use crate::config::{AgentConfig, EndpointConfig, default_agent_name};
use crate::error::{AgentError, StartError};
use crate::logging::{LogValue, Logger};
use crate::proxy::ProxyFactory;

/// One link of the factory chain.
///
/// `start` returns true when the factory claims the agent, in which case it
/// is expected to have spawned the agent's work into `options.group`. A
/// factory returning false must not have started anything.
pub trait AgentFactory: Send + Sync {
    fn start(&self, cancel: &CancellationToken, options: &AgentOptions) -> bool;
}

impl<F> AgentFactory for F
where
    F: Fn(&CancellationToken, &AgentOptions) -> bool + Send + Sync,
{
    fn start(&self, cancel: &CancellationToken, options: &AgentOptions) -> bool {
        self(cancel, options)
    }
}

pub struct AgentStarter {
    proxy_factory: Arc<dyn ProxyFactory>,
    backoffs: Arc<BackoffRegistry>,
    logger: Arc<dyn Logger>,
}

impl AgentStarter {
    pub fn new(
        proxy_factory: Arc<dyn ProxyFactory>,
        backoffs: Arc<BackoffRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            proxy_factory,
            backoffs,
            logger,
        }
    }

    /// Starts every agent in `agents` under one supervision group derived
    /// from `cancel`.
    ///
    /// Agents whose proxy cannot be built are logged and skipped. Each
    /// remaining agent is offered to `factories` in order until one claims
    /// it; agents nobody claims never run. The returned waiter resolves once
    /// every claimed agent has returned.
    pub fn start(
        &self,
        cancel: &CancellationToken,
        agents: &[AgentConfig],
        factories: &[Arc<dyn AgentFactory>],
        pings: PingSender,
    ) -> Result<AgentWaiter, StartError> {
        if agents.is_empty() {
            return Err(StartError::NoAgentsConfigured);
        }

        let group = SupervisionGroup::new(cancel);
        let mut claimed = 0usize;

        for (i, agent) in agents.iter().enumerate() {
            let name = agent
                .name
                .clone()
                .unwrap_or_else(|| default_agent_name(i));

            let endpoint = EndpointConfig::for_agent(&name, agent);
            let proxy = match self.proxy_factory.new_proxy(&endpoint) {
                Ok(proxy) => proxy,
                Err(err) => {
                    self.logger.error(&[
                        "[SERVICE: AsyncAgent]".into(),
                        LogValue::field("agent", &name),
                        "building the proxy:".into(),
                        LogValue::error(&err),
                    ]);
                    continue;
                }
            };

            let max_retries = agent.connection.normalized_max_retries();
            let options = AgentOptions {
                name: name.clone(),
                agent: AgentConfig {
                    name: Some(name.clone()),
                    ..agent.clone()
                },
                proxy,
                pings: pings.clone(),
                group: group.clone(),
                should_retry: retry_predicate(max_retries),
                backoff: self
                    .backoffs
                    .resolve(&agent.connection.backoff_strategy, None),
                logger: Arc::clone(&self.logger),
            };

            let token = group.token();
            match factories.iter().position(|f| f.start(token, &options)) {
                Some(index) => {
                    debug!(agent = %name, factory = index, "Agent claimed");
                    claimed += 1;
                }
                None => debug!(agent = %name, "No factory claimed the agent"),
            }
        }

        info!(
            configured = agents.len(),
            claimed,
            running = group.running(),
            "Async agents started"
        );

        Ok(AgentWaiter { group })
    }
}

/// Handle on the agents started by one [`AgentStarter::start`] call.
#[derive(Debug, Clone)]
pub struct AgentWaiter {
    group: SupervisionGroup,
}

impl AgentWaiter {
    /// Waits for every agent to return and reports the first failure.
    pub async fn wait(&self) -> Result<(), AgentError> {
        self.group.wait().await
    }

    /// Cancels every agent of this start.
    pub fn cancel(&self) {
        self.group.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        self.group.token()
    }

    pub fn running(&self) -> usize {
        self.group.running()
    }
}
