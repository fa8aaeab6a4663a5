// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types returned by the switchyard API.
//!
//! Lookup misses in a [`Registry`](crate::registry::Registry) are not
//! represented here: they always resolve to a documented fallback.

use std::sync::Arc;

use thiserror::Error;

/// An opaque cause coming from an external collaborator (a discovery
/// backend, a transport, a codec).
pub type BoxedCause = Arc<dyn std::error::Error + Send + Sync>;

/// A subscriber could not produce the current host list.
#[derive(Debug, Clone, Error)]
pub enum SubscriberError {
    /// The discovery backend reported a failure.
    #[error("host discovery failed: {0}")]
    Discovery(BoxedCause),

    /// The discovery backend has stopped publishing updates.
    #[error("host discovery for {0} is closed")]
    Closed(String),
}

impl SubscriberError {
    /// Wraps an error from a discovery backend.
    pub fn discovery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Discovery(Arc::new(err))
    }
}

/// A balancer could not select a host.
#[derive(Debug, Clone, Error)]
pub enum BalancerError {
    /// The subscriber returned an empty host list.
    #[error("no hosts available")]
    NoHostsAvailable,

    /// The subscriber itself failed. The error is passed through unchanged.
    #[error(transparent)]
    Subscriber(#[from] SubscriberError),
}

/// Errors building or invoking a proxy.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// The proxy factory rejected the endpoint definition.
    #[error("unable to build proxy for {endpoint}: {reason}")]
    BuildFailed {
        /// Endpoint (agent) name.
        endpoint: String,
        /// Why the factory refused it.
        reason: String,
    },

    /// No host could be selected for the request.
    #[error(transparent)]
    Balancer(#[from] BalancerError),

    /// The backend response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The backend answered with an unexpected status.
    #[error("backend {host} answered with status {status}")]
    Status {
        /// Host that produced the response.
        host: String,
        /// HTTP-like status code.
        status: u16,
    },

    /// The call was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// Transport level failure.
    #[error("backend transport error: {0}")]
    Transport(BoxedCause),
}

impl ProxyError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

/// A decoder could not turn a byte stream into a value map.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Reading the stream failed.
    #[error("unable to read payload: {0}")]
    Io(Arc<std::io::Error>),

    /// The payload is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(Arc<serde_json::Error>),

    /// The payload is valid JSON but of an unexpected shape.
    #[error("expected a JSON {expected}")]
    UnexpectedShape {
        /// The shape the decoder needed.
        expected: &'static str,
    },

    /// The payload is not valid UTF-8.
    #[error("payload is not valid UTF-8")]
    Utf8,
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// Failure reported by a supervised agent.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The retry predicate refused another connection attempt.
    #[error("agent {agent} gave up connecting after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Agent name.
        agent: String,
        /// Number of attempts made.
        attempts: u64,
        /// The last connection error.
        source: ProxyError,
    },

    /// The agent stopped because its cancellation domain was cancelled.
    #[error("agent {0} cancelled")]
    Cancelled(String),
}

/// Errors returned by [`AgentStarter::start`](crate::agent::AgentStarter::start).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StartError {
    /// The agent list was empty; nothing was started.
    #[error("no async agents configured")]
    NoAgentsConfigured,
}
