// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Async agent supervision.
//!
//! [`AgentStarter::start`] builds an [`AgentOptions`] per configured agent
//! and offers it to an ordered chain of [`AgentFactory`] values; the first
//! factory to claim an agent spawns its work into the shared
//! [`SupervisionGroup`]. Factories usually drive the connection phase with
//! [`connect_with_retries`].

mod group;
mod options;
mod retry;
mod starter;

pub use group::SupervisionGroup;
pub use options::{AgentOptions, AgentPing, PingSender, RetryPredicate, retry_predicate};
pub use retry::{ConnectionState, connect_with_retries};
pub use starter::{AgentFactory, AgentStarter, AgentWaiter};
