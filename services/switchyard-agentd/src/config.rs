// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Configuration for the agent daemon

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use switchyard::config::AgentConfig;

/// Default capacity of the ping channel.
pub const DEFAULT_PING_CAPACITY: usize = 64;

/// Default timeout of a single backend request, in seconds.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Service configuration loaded from a JSON file
///
/// ```json
/// {
///     "async_agent": [
///         {
///             "name": "cart",
///             "backend": [{ "host": ["http://10.0.0.5:8080"], "url_pattern": "/ping" }],
///             "connection": { "max_retries": 10, "backoff_strategy": "exponential" }
///         }
///     ]
/// }
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Agents to start, in order.
    pub async_agent: Vec<AgentConfig>,

    /// Capacity of the channel agents report liveness on
    pub ping_capacity: usize,

    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            async_agent: Vec::new(),
            ping_capacity: DEFAULT_PING_CAPACITY,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::io::Write;
    use switchyard::BalancerKind;

    #[test]
    fn test_defaults() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.async_agent.is_empty());
        assert_eq!(config.ping_capacity, DEFAULT_PING_CAPACITY);
    }

    #[test]
    fn test_parse_agents() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{
                "ping_capacity": 8,
                "async_agent": [
                    {},
                    {
                        "name": "cart",
                        "backend": [{
                            "host": ["a:80", "b:80"],
                            "lb": "random",
                            "lb_seed": 7,
                            "url_pattern": "/__health"
                        }],
                        "connection": {"max_retries": 3, "backoff_strategy": "linear"},
                        "extra_config": {"router": {"timeout": "1s"}}
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.ping_capacity, 8);
        assert_eq!(config.async_agent.len(), 2);
        assert_eq!(config.async_agent[0], AgentConfig::default());

        let cart = &config.async_agent[1];
        assert_eq!(cart.name.as_deref(), Some("cart"));
        assert_eq!(cart.backend[0].hosts, vec!["a:80", "b:80"]);
        assert_eq!(cart.backend[0].lb, BalancerKind::Random);
        assert_eq!(cart.backend[0].lb_seed, Some(7));
        assert_eq!(cart.backend[0].method, "GET");
        assert_eq!(cart.connection.normalized_max_retries(), 3);
        assert_eq!(cart.connection.backoff_strategy, "linear");
        assert!(cart.extra_config.contains_key("router"));
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"async_agent": [{{"name": "a"}}]}}"#).unwrap();

        let config = ServiceConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.async_agent[0].name.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_from_file_errors_name_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ServiceConfig::from_file(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        let err = ServiceConfig::from_file(Path::new("/nonexistent/switchyard.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
