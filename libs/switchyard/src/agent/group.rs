// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! A group of tasks sharing one cancellation domain.
//!
//! The first member to fail cancels every sibling, and [`wait`] reports that
//! first failure once all members have returned. A member stopping with
//! [`AgentError::Cancelled`] is not a failure: it is how members react to
//! the group being cancelled.
//!
//! [`wait`]: SupervisionGroup::wait

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::error::AgentError;

#[derive(Clone, Debug)]
pub struct SupervisionGroup {
    token: CancellationToken,
    tracker: TaskTracker,
    first_error: Arc<Mutex<Option<AgentError>>>,
}

impl SupervisionGroup {
    /// Creates a group whose token is a child of `parent`: cancelling the
    /// parent cancels the group, a member failure does not cancel the parent.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tracker: TaskTracker::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The group's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs `task` as a member of the group.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Result<(), AgentError>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);
        self.tracker.spawn(async move {
            match task.await {
                Ok(()) => {}
                Err(AgentError::Cancelled(agent)) => {
                    debug!(agent = %agent, "Group member stopped on cancellation");
                }
                Err(err) => {
                    warn!(error = %err, "Group member failed, cancelling siblings");
                    let mut slot = first_error
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                    drop(slot);
                    token.cancel();
                }
            }
        });
    }

    /// Number of members still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for every member to return, then yields the first failure.
    ///
    /// Members may still be added while waiting; the wait covers them too.
    /// Every call, on any clone, reports the same first failure.
    pub async fn wait(&self) -> Result<(), AgentError> {
        self.tracker.close();
        self.tracker.wait().await;
        match self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn exhausted(agent: &str) -> AgentError {
        AgentError::RetriesExhausted {
            agent: agent.to_string(),
            attempts: 1,
            source: ProxyError::Cancelled,
        }
    }

    #[tokio::test]
    async fn test_wait_empty_group() {
        let group = SupervisionGroup::new(&CancellationToken::new());
        group.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_all_members() {
        let group = SupervisionGroup::new(&CancellationToken::new());
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..3u64 {
            let done = Arc::clone(&done);
            group.spawn(async move {
                tokio::time::sleep(Duration::from_millis(10 * i)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        group.wait().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(group.running(), 0);
    }

    #[tokio::test]
    async fn test_first_error_cancels_siblings() {
        let parent = CancellationToken::new();
        let group = SupervisionGroup::new(&parent);

        let token = group.token().clone();
        group.spawn(async move {
            token.cancelled().await;
            Err(AgentError::Cancelled("sibling".to_string()))
        });
        group.spawn(async { Err(exhausted("first")) });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::RetriesExhausted { ref agent, .. } if agent == "first"
        ));
        assert!(group.token().is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_only_first_error_reported() {
        let group = SupervisionGroup::new(&CancellationToken::new());
        group.spawn(async { Err(exhausted("a")) });
        tokio::task::yield_now().await;
        group.spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(exhausted("b"))
        });

        match group.wait().await {
            Err(AgentError::RetriesExhausted { agent, .. }) => assert_eq!(agent, "a"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parent_cancellation_is_not_an_error() {
        let parent = CancellationToken::new();
        let group = SupervisionGroup::new(&parent);

        let token = group.token().clone();
        group.spawn(async move {
            token.cancelled().await;
            Err(AgentError::Cancelled("worker".to_string()))
        });

        parent.cancel();
        group.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_wait_reports_same_error() {
        let group = SupervisionGroup::new(&CancellationToken::new());
        group.spawn(async { Err(exhausted("a")) });

        let handle = group.clone();
        for result in [group.wait().await, group.wait().await, handle.wait().await] {
            match result {
                Err(AgentError::RetriesExhausted { agent, .. }) => assert_eq!(agent, "a"),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }
}
