//! HTTP client for the case management backend.
//!
//! Failures here are the only user-visible failure class: they surface to
//! the command layer as typed errors with a human-readable message.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use sonda_common::SystemProfile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request to the backend failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Shape the case endpoints answer with.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the backend REST API.
pub struct BackendClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl BackendClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Ask the backend to build an installer for the detected system.
    ///
    /// Returns the binary artifact. Installer generation can take a while,
    /// so this call gets a longer timeout than the rest.
    pub async fn generate_installer(
        &self,
        system: &SystemProfile,
        user_id: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .post(format!("{}/generate-installer", self.api_base))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&json!({ "system": system, "user_id": user_id }))
            .timeout(Duration::from_secs(300))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Ask the backend to open a case folder on the operator's machine.
    ///
    /// The endpoint answers `{success, message?}` whatever the outcome, so
    /// the body is parsed regardless of the HTTP status.
    pub async fn open_case_folder(&self, session_id: &str) -> Result<CaseResponse, BackendError> {
        let response = self
            .client
            .get(format!("{}/abrir_carpeta/{session_id}", self.api_base))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        Ok(response.json().await?)
    }

    /// Finalize a case. Any success status counts; the body is optional.
    pub async fn complete_case(&self, session_id: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .post(format!("{}/completar_caso/{session_id}", self.api_base))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonda_common::{ProbeConfig, SystemDetector};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Whether `data` holds a complete HTTP request (headers plus any body
    /// announced by Content-Length).
    fn request_complete(data: &[u8]) -> bool {
        let raw = String::from_utf8_lossy(data);
        let Some(header_end) = raw.find("\r\n\r\n") else {
            return false;
        };
        let content_length = raw
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        data.len() >= header_end + 4 + content_length
    }

    async fn serve_once(response: String) -> (u16, tokio::sync::oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut data = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&buf[..n]);
                if request_complete(&data) {
                    break;
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&data).to_string());
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        (port, rx)
    }

    fn response_with(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn open_case_folder_parses_the_envelope() {
        let (port, request) = serve_once(response_with(
            "200 OK",
            r#"{"success":true,"message":"Comando enviado"}"#,
        ))
        .await;

        let client = BackendClient::new(&format!("http://127.0.0.1:{port}/api"), "tok").unwrap();
        let case = client.open_case_folder("abc123").await.unwrap();

        assert!(case.success);
        assert_eq!(case.message.as_deref(), Some("Comando enviado"));

        let raw = request.await.unwrap();
        assert!(raw.starts_with("GET /api/abrir_carpeta/abc123"));
        assert!(raw.contains("authorization: Bearer tok") || raw.contains("Authorization: Bearer tok"));
    }

    #[tokio::test]
    async fn complete_case_accepts_any_success_status() {
        let (port, request) = serve_once(response_with("200 OK", "")).await;

        let client = BackendClient::new(&format!("http://127.0.0.1:{port}/api"), "tok").unwrap();
        client.complete_case("abc123").await.unwrap();

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /api/completar_caso/abc123"));
    }

    #[tokio::test]
    async fn complete_case_surfaces_server_errors() {
        let (port, _request) = serve_once(response_with("500 Internal Server Error", "")).await;

        let client = BackendClient::new(&format!("http://127.0.0.1:{port}/api"), "tok").unwrap();
        let err = client.complete_case("abc123").await.unwrap_err();

        assert!(matches!(err, BackendError::Status(status) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn generate_installer_returns_the_artifact() {
        let (port, request) = serve_once(response_with("200 OK", "BINARY")).await;

        let client = BackendClient::new(&format!("http://127.0.0.1:{port}/api"), "tok").unwrap();
        let profile = SystemDetector::new(ProbeConfig::default()).detect();
        let artifact = client.generate_installer(&profile, "operator-7").await.unwrap();

        assert_eq!(artifact, b"BINARY");

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /api/generate-installer"));
        assert!(raw.contains("\"user_id\":\"operator-7\""));
    }
}
