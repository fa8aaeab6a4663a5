// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The request/response call agents use to reach their backend.
//!
//! Proxies are built outside this crate by a [`ProxyFactory`] from an
//! [`EndpointConfig`]; the agent starter only invokes them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::EndpointConfig;
use crate::error::ProxyError;

/// A request sent through a proxy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, Vec<String>>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Transport details of a response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    pub status_code: u16,
    pub headers: BTreeMap<String, Vec<String>>,
}

/// A decoded backend response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub data: Map<String, Value>,
    /// False when only part of the backends answered.
    pub is_complete: bool,
    pub metadata: Metadata,
}

/// Request to response call against one endpoint.
#[async_trait]
pub trait Proxy: Send + Sync {
    /// Performs the call. Implementations return [`ProxyError::Cancelled`]
    /// promptly once `cancel` fires.
    async fn call(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<Response, ProxyError>;
}

/// Builds the proxy for one endpoint.
pub trait ProxyFactory: Send + Sync {
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>, ProxyError>;
}

/// Adapts an async closure into a [`Proxy`].
pub struct FnProxy<F> {
    f: F,
}

impl<F, Fut> FnProxy<F>
where
    F: Fn(CancellationToken, Request) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Response, ProxyError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Proxy for FnProxy<F>
where
    F: Fn(CancellationToken, Request) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Response, ProxyError>> + Send,
{
    async fn call(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<Response, ProxyError> {
        (self.f)(cancel.clone(), request).await
    }
}

impl<F> ProxyFactory for F
where
    F: Fn(&EndpointConfig) -> Result<Arc<dyn Proxy>, ProxyError> + Send + Sync,
{
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>, ProxyError> {
        self(endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_proxy_echoes_path() {
        let proxy = FnProxy::new(|_cancel, request: Request| async move {
            let mut data = Map::new();
            data.insert("path".to_string(), Value::String(request.path));
            Ok(Response {
                data,
                is_complete: true,
                metadata: Metadata {
                    status_code: 200,
                    ..Default::default()
                },
            })
        });

        let response = proxy
            .call(&CancellationToken::new(), Request::new("GET", "/health"))
            .await
            .unwrap();
        assert!(response.is_complete);
        assert_eq!(response.data.get("path"), Some(&Value::from("/health")));
    }

    #[test]
    fn test_closure_proxy_factory() {
        let factory = |endpoint: &EndpointConfig| -> Result<Arc<dyn Proxy>, ProxyError> {
            Err(ProxyError::BuildFailed {
                endpoint: endpoint.name.clone(),
                reason: "no backend".to_string(),
            })
        };

        let endpoint = EndpointConfig {
            name: "AsyncAgent-00".to_string(),
            backend: vec![],
            extra_config: Map::new(),
        };
        let err = match factory.new_proxy(&endpoint) {
            Err(err) => err,
            Ok(_) => panic!("factory should refuse an endpoint without backends"),
        };
        assert_eq!(
            err.to_string(),
            "unable to build proxy for AsyncAgent-00: no backend"
        );
    }
}
