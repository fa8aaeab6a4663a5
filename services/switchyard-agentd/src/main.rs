// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Switchyard Agent Daemon
//!
//! Starts every configured async agent, keeps each one connected to its
//! backends and logs the liveness pings they send. Runs until every agent
//! has stopped, one agent gives up connecting, or the process receives
//! SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use switchyard::agent::{AgentFactory, AgentPing, AgentStarter};
use switchyard::backoff::BackoffRegistry;
use switchyard::encoding::DecoderRegistry;
use switchyard::logging::{Logger, TracingLogger};
use switchyard::subscriber::SubscriberRegistry;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use switchyard_agentd::config::ServiceConfig;
use switchyard_agentd::http_proxy::HttpProxyFactory;
use switchyard_agentd::probe::ProbeAgentFactory;

#[derive(Parser)]
#[command(name = "switchyard-agentd")]
#[command(about = "Keeps async agents connected to their backends", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "SWITCHYARD_CONFIG")]
    config: PathBuf,

    /// Capacity of the ping channel (overrides the configuration file)
    #[arg(long)]
    ping_capacity: Option<usize>,
}

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");
    let buildstamp = option_env!("STAMP").unwrap_or("no-STAMP");
    println!("{} {} ({})", name, version, buildstamp);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "switchyard=info,switchyard_agentd=info".to_string()),
        ))
        .init();

    print_version();

    let mut config = ServiceConfig::from_file(&args.config).await?;
    if let Some(capacity) = args.ping_capacity {
        config.ping_capacity = capacity;
    }
    info!(
        config_file = %args.config.display(),
        agents = config.async_agent.len(),
        "Configuration loaded"
    );

    let subscribers = Arc::new(SubscriberRegistry::new());
    let decoders = Arc::new(DecoderRegistry::with_defaults());
    let backoffs = Arc::new(BackoffRegistry::with_defaults());
    debug!(backoff_strategies = ?backoffs.names(), "Registries ready");

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new("switchyard-agentd"));
    let starter = AgentStarter::new(
        Arc::new(HttpProxyFactory::new(client, subscribers, decoders)),
        backoffs,
        logger,
    );
    let factories: Vec<Arc<dyn AgentFactory>> = vec![Arc::new(ProbeAgentFactory::default())];

    // The channel closes once every agent has returned.
    let (pings, mut ping_rx) = mpsc::channel::<AgentPing>(config.ping_capacity.max(1));
    let pings_drained = tokio::spawn(async move {
        while let Some(ping) = ping_rx.recv().await {
            debug!(agent = %ping.agent, "Ping");
        }
    });

    let shutdown = CancellationToken::new();
    let waiter = starter
        .start(&shutdown, &config.async_agent, &factories, pings)
        .context("Failed to start async agents")?;

    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let result = waiter.wait().await;
    if pings_drained.await.is_err() {
        warn!("Ping drain task panicked");
    }

    result.context("Async agent failed")?;
    info!("All async agents stopped");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
    }

    info!("Shutdown requested, cancelling async agents");
    shutdown.cancel();
}
