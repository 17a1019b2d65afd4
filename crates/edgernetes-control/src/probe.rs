use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use edgernetes_common::{HeartbeatRequest, HeartbeatResponse, NodeInfo};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("node {node_id} has no reachable address")]
    NoAddress { node_id: String },

    #[error("heartbeat to {url} failed ({kind}): {source}")]
    Transport {
        url: String,
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("heartbeat to {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("decode heartbeat response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Asks one node how it and its replicas are doing.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, node: &NodeInfo) -> Result<HeartbeatResponse, ProbeError>;
}

/// Probes a node's agent with `POST http://<ip>:<port>/heartbeat`.
///
/// Each call is bounded by the client timeout; the heartbeat loop adds none.
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    http: reqwest::Client,
}

fn classify_reqwest_error(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        return "timeout";
    }
    if error.is_connect() {
        return "connect";
    }
    "other"
}

pub fn heartbeat_url(node: &NodeInfo) -> Option<String> {
    if node.ip.is_empty() || node.port == 0 {
        return None;
    }
    let host = if node.ip.contains(':') && !node.ip.starts_with('[') {
        format!("[{}]", node.ip)
    } else {
        node.ip.clone()
    };
    Some(format!("http://{host}:{}/heartbeat", node.port))
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(3)))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, node: &NodeInfo) -> Result<HeartbeatResponse, ProbeError> {
        let url = heartbeat_url(node).ok_or_else(|| ProbeError::NoAddress {
            node_id: node.id.clone(),
        })?;

        let resp = self
            .http
            .post(&url)
            .json(&HeartbeatRequest {
                node_id: node.id.clone(),
            })
            .send()
            .await
            .map_err(|source| ProbeError::Transport {
                url: url.clone(),
                kind: classify_reqwest_error(&source),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProbeError::Status { url, status });
        }

        resp.json::<HeartbeatResponse>()
            .await
            .map_err(|source| ProbeError::Decode { url, source })
    }
}
