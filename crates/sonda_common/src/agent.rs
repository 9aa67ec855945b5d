//! Companion agent liveness probe.
//!
//! The agent is a separate local service exposing `/status`. One bounded
//! request per call, no retries; every failure collapses into the
//! disconnected sentinel so callers never see an error from this path.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProbeConfig;

/// Snapshot of the companion agent's reported state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub connected: bool,
    pub status: Option<String>,
    pub version: Option<String>,
    /// Acquisition format name -> availability, as reported by the agent.
    pub capabilities: BTreeMap<String, bool>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl AgentStatus {
    /// The sentinel for an unreachable agent. Never partially filled.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            status: Some("disconnected".to_string()),
            version: None,
            capabilities: BTreeMap::new(),
            last_seen: None,
        }
    }
}

/// Wire shape of the agent's status payload.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    agent: AgentPayload,
}

#[derive(Debug, Deserialize)]
struct AgentPayload {
    status: Option<String>,
    version: Option<String>,
    #[serde(default)]
    available_formats: BTreeMap<String, serde_json::Value>,
}

/// Client for the companion agent's status endpoint.
pub struct AgentClient {
    client: reqwest::Client,
    status_url: String,
    token: String,
}

impl AgentClient {
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.effective_agent_timeout()))
            .build()
            .context("building agent HTTP client")?;

        Ok(Self {
            client,
            status_url: config.agent_status_url(),
            token: config.agent_token.clone(),
        })
    }

    /// Probe the agent once.
    ///
    /// Always resolves to an `AgentStatus`; an unreachable agent, a
    /// non-success response, or a malformed payload yields the
    /// disconnected sentinel.
    pub async fn check_status(&self) -> AgentStatus {
        match self.try_status().await {
            Ok(status) => status,
            Err(e) => {
                debug!("companion agent not available: {e:#}");
                AgentStatus::disconnected()
            }
        }
    }

    async fn try_status(&self) -> Result<AgentStatus> {
        let response = self
            .client
            .get(&self.status_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("status request failed")?;

        if !response.status().is_success() {
            bail!("agent returned HTTP {}", response.status());
        }

        let envelope: StatusEnvelope = response
            .json()
            .await
            .context("malformed status payload")?;

        Ok(AgentStatus {
            connected: true,
            status: envelope.agent.status,
            version: envelope.agent.version,
            capabilities: envelope
                .agent
                .available_formats
                .into_iter()
                .map(|(format, value)| {
                    // The agent reports bool-likes; anything non-null counts.
                    let available = value.as_bool().unwrap_or(!value.is_null());
                    (format, available)
                })
                .collect(),
            last_seen: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn config_for_port(port: u16) -> ProbeConfig {
        let mut config = ProbeConfig::default();
        config.agent_host = "127.0.0.1".to_string();
        config.agent_port = port;
        config.agent_timeout_secs = 2;
        config
    }

    async fn free_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    async fn serve_once(response: String) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        port
    }

    fn json_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn unreachable_agent_yields_the_exact_sentinel() {
        let port = free_port().await;
        let client = AgentClient::new(&config_for_port(port)).unwrap();

        let status = client.check_status().await;
        assert_eq!(status, AgentStatus::disconnected());
        assert!(!status.connected);
        assert_eq!(status.status.as_deref(), Some("disconnected"));
        assert!(status.version.is_none());
        assert!(status.capabilities.is_empty());
        assert!(status.last_seen.is_none());
    }

    #[tokio::test]
    async fn error_status_yields_the_sentinel() {
        let port = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
        )
        .await;
        let client = AgentClient::new(&config_for_port(port)).unwrap();

        let status = client.check_status().await;
        assert_eq!(status, AgentStatus::disconnected());
    }

    #[tokio::test]
    async fn running_agent_payload_is_mapped() {
        let body = r#"{"agent":{"status":"running","version":"2.1.0","available_formats":{"dd":true,"e01":true,"aff4":false}}}"#;
        let port = serve_once(json_response(body)).await;

        let client = AgentClient::new(&config_for_port(port)).unwrap();
        let status = client.check_status().await;

        assert!(status.connected);
        assert_eq!(status.status.as_deref(), Some("running"));
        assert_eq!(status.version.as_deref(), Some("2.1.0"));
        assert_eq!(status.capabilities.get("dd"), Some(&true));
        assert_eq!(status.capabilities.get("aff4"), Some(&false));
        assert!(status.last_seen.is_some());
    }

    #[tokio::test]
    async fn bool_like_format_values_are_coerced() {
        let body = r#"{"agent":{"status":"running","version":"2.1.0","available_formats":{"dd":"yes","aff4":null}}}"#;
        let port = serve_once(json_response(body)).await;

        let client = AgentClient::new(&config_for_port(port)).unwrap();
        let status = client.check_status().await;

        assert!(status.connected);
        assert_eq!(status.capabilities.get("dd"), Some(&true));
        assert_eq!(status.capabilities.get("aff4"), Some(&false));
    }

    #[tokio::test]
    async fn malformed_payload_yields_the_sentinel() {
        let port = serve_once(json_response("{}")).await;
        let client = AgentClient::new(&config_for_port(port)).unwrap();

        let status = client.check_status().await;
        assert_eq!(status, AgentStatus::disconnected());
    }
}
