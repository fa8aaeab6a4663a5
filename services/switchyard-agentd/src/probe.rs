// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Probing agents.
//!
//! A probing agent connects by calling its proxy, retrying per the agent's
//! connection policy. Once connected it re-probes every health interval and
//! pings on each success. A failed probe drops it back into the connection
//! phase with a fresh retry budget.

use switchyard::agent::{AgentFactory, AgentOptions, connect_with_retries};
use switchyard::error::{AgentError, ProxyError};
use switchyard::logging::LogValue;
use switchyard::proxy::{Request, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Claims every agent it is offered.
#[derive(Debug, Clone)]
pub struct ProbeAgentFactory {
    request: Request,
}

impl Default for ProbeAgentFactory {
    fn default() -> Self {
        Self::new(Request::new("GET", "/"))
    }
}

impl ProbeAgentFactory {
    /// Probes with `request`.
    pub fn new(request: Request) -> Self {
        Self { request }
    }
}

impl AgentFactory for ProbeAgentFactory {
    fn start(&self, cancel: &CancellationToken, options: &AgentOptions) -> bool {
        let probe = Probe {
            options: options.clone(),
            cancel: cancel.clone(),
            request: self.request.clone(),
        };
        options.group.spawn(probe.run());
        true
    }
}

struct Probe {
    options: AgentOptions,
    cancel: CancellationToken,
    request: Request,
}

impl Probe {
    async fn run(self) -> Result<(), AgentError> {
        let name = self.options.name.clone();
        let interval = self.options.agent.connection.health_interval();

        loop {
            connect_with_retries(&self.options, &self.cancel, |_| self.probe()).await?;
            info!(agent = %name, "Agent connected");
            self.ping().await?;

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(AgentError::Cancelled(name)),
                    _ = tokio::time::sleep(interval) => {}
                }

                match self.probe().await {
                    Ok(_) => self.ping().await?,
                    Err(ProxyError::Cancelled) => return Err(AgentError::Cancelled(name)),
                    Err(err) => {
                        self.options.logger.warning(&[
                            "[AGENT]".into(),
                            LogValue::field("agent", &name),
                            "lost connection:".into(),
                            LogValue::error(&err),
                        ]);
                        break;
                    }
                }
            }
        }
    }

    async fn probe(&self) -> Result<Response, ProxyError> {
        self.options
            .proxy
            .call(&self.cancel, self.request.clone())
            .await
    }

    /// A full channel must not outlive cancellation.
    async fn ping(&self) -> Result<(), AgentError> {
        if !self.options.ping(&self.cancel).await? {
            debug!(agent = %self.options.name, "Ping channel closed");
        }
        Ok(())
    }
}
