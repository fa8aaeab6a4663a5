// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Backend connectivity control plane.
//!
//! # Architecture
//!
//! The crate is layered from the leaves up:
//!
//! 1. [`registry`]: name to value maps, optionally namespaced.
//! 2. [`subscriber`]: discovery of the live hosts of a backend.
//! 3. [`balancer`]: per-call host selection over a subscriber.
//! 4. [`agent`]: supervision of long-lived workers that connect to a
//!    backend, retrying with a [`backoff`] strategy until they succeed or
//!    give up, under one cancellation domain.
//!
//! Collaborators that live outside the crate are modelled as capabilities
//! injected by the caller: a [`proxy::ProxyFactory`] building request to
//! response calls, [`encoding`] decoders and a [`logging::Logger`].
//!
//! # Example
//!
//! ```ignore
//! let starter = AgentStarter::new(proxy_factory, backoffs, logger);
//! let (pings, mut rx) = tokio::sync::mpsc::channel(16);
//! let waiter = starter.start(&cancel, &config.async_agent, &factories, pings)?;
//! waiter.wait().await?;
//! ```

pub mod agent;
pub mod backoff;
pub mod balancer;
pub mod config;
pub mod encoding;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod registry;
pub mod subscriber;

pub use agent::{AgentFactory, AgentOptions, AgentStarter, AgentWaiter};
pub use balancer::{Balancer, BalancerKind};
pub use config::{AgentConfig, BackendConfig, EndpointConfig};
pub use error::{AgentError, BalancerError, ProxyError, StartError, SubscriberError};
pub use subscriber::{Host, Subscriber};
