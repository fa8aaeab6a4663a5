// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Switchyard agent daemon
//!
//! Composition root for the `switchyard` library:
//!
//! - [`config`]: the service configuration document
//! - [`http_proxy`]: an HTTP [`ProxyFactory`](switchyard::proxy::ProxyFactory)
//!   balancing calls over each backend's discovered hosts
//! - [`probe`]: the catch-all agent factory that keeps a backend connected
//!   and reports liveness on the ping channel

pub mod config;
pub mod http_proxy;
pub mod probe;
