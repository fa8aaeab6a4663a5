// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The connection phase of an agent.
//!
//! ```text
//! Connecting --ok--> Connected
//!     |
//!     +--err, retry allowed--> Retrying --backoff--> Connecting
//!     |
//!     +--err, retry refused--> Failed
//! ```
//!
//! Attempts are strictly sequential. Cancellation is observed both while an
//! attempt is in flight and while sleeping between attempts.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::options::AgentOptions;
use crate::error::{AgentError, ProxyError};
use crate::logging::LogValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Retrying,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Retrying => "retrying",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Calls `connect` until it succeeds, the retry predicate refuses the next
/// attempt, or `cancel` fires.
///
/// `connect` receives the attempt number, starting at 0 for the first
/// attempt; attempt `n > 0` is retry `n`. Before retry `n` the agent sleeps
/// `backoff(n)`.
pub async fn connect_with_retries<T, F, Fut>(
    options: &AgentOptions,
    cancel: &CancellationToken,
    mut connect: F,
) -> Result<T, AgentError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<T, ProxyError>>,
{
    let name = options.name.as_str();
    let mut attempt: u64 = 0;

    loop {
        debug!(agent = %name, attempt, state = %ConnectionState::Connecting, "Connecting");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AgentError::Cancelled(name.to_string())),
            result = connect(attempt) => result,
        };

        let err = match result {
            Ok(connected) => {
                debug!(agent = %name, attempt, state = %ConnectionState::Connected, "Connected");
                options.logger.info(&[
                    "[AGENT]".into(),
                    LogValue::field("agent", name),
                    "connected".into(),
                ]);
                return Ok(connected);
            }
            Err(ProxyError::Cancelled) => return Err(AgentError::Cancelled(name.to_string())),
            Err(err) => err,
        };

        let next = attempt.saturating_add(1);
        if !(options.should_retry)(next) {
            debug!(agent = %name, attempt, state = %ConnectionState::Failed, "Giving up");
            options.logger.error(&[
                "[AGENT]".into(),
                LogValue::field("agent", name),
                "connection retries exhausted".into(),
                LogValue::error(&err),
            ]);
            return Err(AgentError::RetriesExhausted {
                agent: name.to_string(),
                attempts: next,
                source: err,
            });
        }

        let wait = (options.backoff)(u32::try_from(next).unwrap_or(u32::MAX));
        debug!(
            agent = %name,
            attempt,
            wait_ms = wait.as_millis() as u64,
            state = %ConnectionState::Retrying,
            "Retrying after backoff"
        );
        options.logger.warning(&[
            "[AGENT]".into(),
            LogValue::field("agent", name),
            "connection failed".into(),
            LogValue::error(&err),
            LogValue::field("retry", next),
            LogValue::field("wait_ms", u64::try_from(wait.as_millis()).unwrap_or(u64::MAX)),
        ]);

        tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Cancelled(name.to_string())),
            _ = tokio::time::sleep(wait) => {}
        }

        attempt = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::group::SupervisionGroup;
    use crate::agent::options::retry_predicate;
    use crate::logging::{Level, MemoryLogger};
    use crate::proxy::{FnProxy, Request, Response};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn options(max_retries: u64, logger: Arc<MemoryLogger>) -> AgentOptions {
        let (pings, _rx) = mpsc::channel(1);
        AgentOptions {
            name: "AsyncAgent-00".to_string(),
            agent: Default::default(),
            proxy: Arc::new(FnProxy::new(|_, _: Request| async {
                Ok::<_, ProxyError>(Response::default())
            })),
            pings,
            group: SupervisionGroup::new(&CancellationToken::new()),
            should_retry: retry_predicate(max_retries),
            backoff: Arc::new(|n: u32| Duration::from_secs(u64::from(n))),
            logger,
        }
    }

    fn refused() -> ProxyError {
        ProxyError::transport(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_after_failures() {
        let logger = Arc::new(MemoryLogger::new());
        let opts = options(5, Arc::clone(&logger));
        let calls = AtomicU64::new(0);
        let started = tokio::time::Instant::now();

        let attempt = connect_with_retries(&opts, &CancellationToken::new(), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(refused()) } else { Ok::<u64, ProxyError>(n) } }
        })
        .await
        .unwrap();

        assert_eq!(attempt, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // backoff(1) + backoff(2)
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(logger.messages_at(Level::Warning).len(), 2);
        assert_eq!(logger.messages_at(Level::Info).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let logger = Arc::new(MemoryLogger::new());
        let opts = options(2, Arc::clone(&logger));
        let calls = AtomicU64::new(0);

        let err = connect_with_retries(&opts, &CancellationToken::new(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(refused()) }
        })
        .await
        .unwrap_err();

        match err {
            AgentError::RetriesExhausted {
                agent, attempts, ..
            } => {
                assert_eq!(agent, "AsyncAgent-00");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(logger.messages_at(Level::Error).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_backoff() {
        let opts = options(u64::MAX, Arc::new(MemoryLogger::new()));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let err = connect_with_retries(&opts, &cancel, |_| async {
            Err::<(), _>(refused())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let opts = options(1, Arc::new(MemoryLogger::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = connect_with_retries(&opts, &cancel, |_| async { Ok::<(), ProxyError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_proxy_cancellation_stops_retrying() {
        let opts = options(u64::MAX, Arc::new(MemoryLogger::new()));
        let err = connect_with_retries(&opts, &CancellationToken::new(), |_| async {
            Err::<(), _>(ProxyError::Cancelled)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled(_)));
    }
}
