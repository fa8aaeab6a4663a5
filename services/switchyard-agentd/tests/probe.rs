// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

// Allow expect/unwrap in tests - they provide clear panic messages on failure
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! End-to-end tests: probing agents started against mock backends.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use switchyard::agent::{AgentFactory, AgentPing, AgentStarter, AgentWaiter};
use switchyard::backoff::BackoffRegistry;
use switchyard::config::{AgentConfig, BackendConfig, EndpointConfig};
use switchyard::encoding::DecoderRegistry;
use switchyard::error::{AgentError, ProxyError};
use switchyard::logging::{Logger, MemoryLogger};
use switchyard::proxy::{FnProxy, Proxy, ProxyFactory, Request, Response};
use switchyard::subscriber::SubscriberRegistry;
use switchyard_agentd::http_proxy::HttpProxyFactory;
use switchyard_agentd::probe::ProbeAgentFactory;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn agent(name: &str, host: String, max_retries: i64) -> AgentConfig {
    let mut config = AgentConfig {
        name: Some(name.to_string()),
        backend: vec![BackendConfig {
            hosts: vec![host],
            url_pattern: "/__health".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    };
    config.connection.max_retries = max_retries;
    config.connection.backoff_strategy = "constant".to_string();
    config.connection.health_interval_secs = 1;
    config
}

fn start(
    cancel: &CancellationToken,
    agents: &[AgentConfig],
) -> (AgentWaiter, mpsc::Receiver<AgentPing>) {
    let logger: Arc<dyn Logger> = Arc::new(MemoryLogger::new());
    let starter = AgentStarter::new(
        Arc::new(HttpProxyFactory::new(
            reqwest::Client::new(),
            Arc::new(SubscriberRegistry::new()),
            Arc::new(DecoderRegistry::with_defaults()),
        )),
        Arc::new(BackoffRegistry::with_defaults()),
        logger,
    );
    let factories: Vec<Arc<dyn AgentFactory>> = vec![Arc::new(ProbeAgentFactory::default())];
    let (pings, rx) = mpsc::channel(16);
    let waiter = starter.start(cancel, agents, &factories, pings).unwrap();
    (waiter, rx)
}

async fn healthy_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;
    server
}

async fn next_ping(rx: &mut mpsc::Receiver<AgentPing>) -> AgentPing {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a ping")
        .expect("ping channel closed")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connected_agent_keeps_pinging() {
    let server = healthy_backend().await;
    let cancel = CancellationToken::new();
    let (waiter, mut rx) = start(&cancel, &[agent("cart", server.uri(), 3)]);

    // One ping on connect, one per successful health probe.
    for _ in 0..2 {
        assert_eq!(next_ping(&mut rx).await.agent, "cart");
    }

    cancel.cancel();
    waiter.wait().await.unwrap();

    // Every sender is gone once the agents have returned.
    while rx.recv().await.is_some() {}
}

#[tokio::test]
async fn test_unreachable_backend_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let healthy = healthy_backend().await;

    let cancel = CancellationToken::new();
    let (waiter, _rx) = start(
        &cancel,
        &[
            agent("healthy", healthy.uri(), 3),
            agent("broken", server.uri(), 1),
        ],
    );

    match waiter.wait().await {
        Err(AgentError::RetriesExhausted {
            agent,
            attempts,
            source,
        }) => {
            assert_eq!(agent, "broken");
            assert_eq!(attempts, 2);
            assert!(matches!(source, ProxyError::Status { status: 500, .. }));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_agent_recovers_after_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/__health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let (waiter, mut rx) = start(&cancel, &[agent("flaky", server.uri(), 0)]);

    assert_eq!(next_ping(&mut rx).await.agent, "flaky");
    assert!(server.received_requests().await.unwrap().len() >= 2);

    cancel.cancel();
    waiter.wait().await.unwrap();
}

#[tokio::test]
async fn test_agent_without_backend_is_skipped() {
    let server = healthy_backend().await;
    let cancel = CancellationToken::new();
    let (waiter, mut rx) = start(
        &cancel,
        &[
            AgentConfig {
                name: Some("empty".to_string()),
                ..Default::default()
            },
            agent("cart", server.uri(), 3),
        ],
    );

    assert_eq!(waiter.running(), 1);
    assert_eq!(next_ping(&mut rx).await.agent, "cart");

    cancel.cancel();
    waiter.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_reaches_agent_blocked_on_full_ping_channel() {
    let proxies: Arc<dyn ProxyFactory> = Arc::new(
        |_: &EndpointConfig| -> Result<Arc<dyn Proxy>, ProxyError> {
            Ok(Arc::new(FnProxy::new(|_, _: Request| async {
                Ok::<_, ProxyError>(Response::default())
            })))
        },
    );
    let logger: Arc<dyn Logger> = Arc::new(MemoryLogger::new());
    let starter = AgentStarter::new(proxies, Arc::new(BackoffRegistry::with_defaults()), logger);
    let factories: Vec<Arc<dyn AgentFactory>> = vec![Arc::new(ProbeAgentFactory::default())];

    // Room for the connect ping only; the receiver is held but never read.
    let (pings, _rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let waiter = starter
        .start(&cancel, &[agent("cart", "unused:1".to_string(), 3)], &factories, pings)
        .unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(60), waiter.wait())
        .await
        .expect("agent stayed blocked after cancellation");
    result.unwrap();
    assert_eq!(waiter.running(), 0);
}
