//! Thin JSON client for the node's REST API.

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Default API endpoint of a local node.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9001";

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
    retryable: bool,
}

pub struct ApiClient {
    endpoint: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let request = self.http.get(self.url(path));
        self.send(request).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> anyhow::Result<T> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> anyhow::Result<T> {
        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                anyhow::bail!(
                    "could not reach node at {} ({}). Is the node running? Start it with: htlcswap-node",
                    self.endpoint,
                    e
                );
            }
        };

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        match resp.json::<ErrorResponse>().await {
            Ok(err) => {
                let hint = if err.retryable { ", retryable" } else { "" };
                anyhow::bail!("request failed (HTTP {}, {}{}): {}", status, err.kind, hint, err.error)
            }
            Err(_) => anyhow::bail!("request failed (HTTP {})", status),
        }
    }
}
