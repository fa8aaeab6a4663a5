// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! HTTP proxies over balanced backends.
//!
//! Each backend of an endpoint gets its own subscriber and balancer. A call
//! picks one host per backend, sends the backend's configured method to
//! `host + url_pattern`, and decodes the body with the backend's decoder.
//! The request contributes query parameters, headers and body. Results of
//! all backends are merged into one response.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Map;
use switchyard::balancer::{Balancer, new_balancer};
use switchyard::config::{BackendConfig, EndpointConfig};
use switchyard::encoding::{Decoder, DecoderRegistry};
use switchyard::error::ProxyError;
use switchyard::proxy::{Metadata, Proxy, ProxyFactory, Request, Response};
use switchyard::subscriber::{SubscriberRegistry, resolve_subscriber};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Builds [`HttpProxy`] instances sharing one HTTP client.
pub struct HttpProxyFactory {
    client: reqwest::Client,
    subscribers: Arc<SubscriberRegistry>,
    decoders: Arc<DecoderRegistry>,
}

impl HttpProxyFactory {
    pub fn new(
        client: reqwest::Client,
        subscribers: Arc<SubscriberRegistry>,
        decoders: Arc<DecoderRegistry>,
    ) -> Self {
        Self {
            client,
            subscribers,
            decoders,
        }
    }

    fn backend(&self, endpoint: &str, config: &BackendConfig) -> Result<HttpBackend, ProxyError> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes()).map_err(
            |_| ProxyError::BuildFailed {
                endpoint: endpoint.to_string(),
                reason: format!("invalid method {:?}", config.method),
            },
        )?;

        let subscriber = resolve_subscriber(&self.subscribers, config);
        Ok(HttpBackend {
            balancer: new_balancer(config.lb, subscriber, config.lb_seed),
            decoder: self.decoders.resolve(&config.encoding, config.is_collection),
            method,
            url_pattern: config.url_pattern.clone(),
        })
    }
}

impl ProxyFactory for HttpProxyFactory {
    fn new_proxy(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn Proxy>, ProxyError> {
        if endpoint.backend.is_empty() {
            return Err(ProxyError::BuildFailed {
                endpoint: endpoint.name.clone(),
                reason: "no backend configured".to_string(),
            });
        }

        let backends = endpoint
            .backend
            .iter()
            .map(|b| self.backend(&endpoint.name, b))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(endpoint = %endpoint.name, backends = backends.len(), "Built HTTP proxy");
        Ok(Arc::new(HttpProxy {
            client: self.client.clone(),
            backends,
        }))
    }
}

struct HttpBackend {
    balancer: Arc<dyn Balancer>,
    decoder: Decoder,
    method: Method,
    url_pattern: String,
}

/// Calls every backend of one endpoint in order.
pub struct HttpProxy {
    client: reqwest::Client,
    backends: Vec<HttpBackend>,
}

impl HttpProxy {
    async fn call_backend(
        &self,
        backend: &HttpBackend,
        request: &Request,
        response: &mut Response,
    ) -> Result<(), ProxyError> {
        let host = backend.balancer.host().await?;
        let url = join_url(&host, &backend.url_pattern);

        let mut builder = self.client.request(backend.method.clone(), &url);
        for (key, values) in &request.query {
            for value in values {
                builder = builder.query(&[(key, value)]);
            }
        }
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let reply = builder.send().await.map_err(ProxyError::transport)?;
        let status = reply.status();
        if !status.is_success() {
            return Err(ProxyError::Status {
                host,
                status: status.as_u16(),
            });
        }

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in reply.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = reply.bytes().await.map_err(ProxyError::transport)?;
        (backend.decoder)(&mut body.as_ref(), &mut response.data)?;

        response.metadata = Metadata {
            status_code: status.as_u16(),
            headers,
        };
        Ok(())
    }
}

#[async_trait]
impl Proxy for HttpProxy {
    async fn call(
        &self,
        cancel: &CancellationToken,
        request: Request,
    ) -> Result<Response, ProxyError> {
        let calls = async {
            let mut response = Response {
                data: Map::new(),
                is_complete: true,
                metadata: Metadata::default(),
            };
            for backend in &self.backends {
                self.call_backend(backend, &request, &mut response).await?;
            }
            Ok(response)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProxyError::Cancelled),
            result = calls => result,
        }
    }
}

/// Joins a host and a path, defaulting to plain HTTP for bare `host:port`.
fn join_url(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if host.contains("://") {
        format!("{}/{}", host, path)
    } else {
        format!("http://{}/{}", host, path)
    }
}
