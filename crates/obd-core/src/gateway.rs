//! **Backend Gateway**: the four calls the dashboard makes to the diagnostics backend.
//!
//! | Call | Endpoint | On failure |
//! |------|----------|------------|
//! | `fetch_pid_catalog` | `GET /api/obd/pids` | empty catalog |
//! | `fetch_live_snapshot` | `GET /api/obd/live` | `GatewayError::Connectivity` |
//! | `fetch_diagnostics` | `GET /api/obd/diagnostics` | empty list |
//! | `post_question` | `POST /api/chat` | `GatewayError::Assistant` |
//!
//! No retries here; the poller's fixed period is the only retry policy.

use crate::config::AssistConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::model::{ChatAnswer, DiagnosticCode, LiveSnapshot, PidCatalog};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const PIDS_PATH: &str = "/api/obd/pids";
const LIVE_PATH: &str = "/api/obd/live";
const DIAGNOSTICS_PATH: &str = "/api/obd/diagnostics";
const CHAT_PATH: &str = "/api/chat";

/// Backend seam. `HttpGateway` is the production implementation; tests plug in stubs.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Supported PIDs. Never fails: any problem yields an empty catalog.
    async fn fetch_pid_catalog(&self) -> PidCatalog;

    /// Current sensor readings. Fails with `Connectivity` on transport or status failure.
    async fn fetch_live_snapshot(&self) -> GatewayResult<LiveSnapshot>;

    /// Active fault codes in backend order. Never fails: any problem yields an empty list.
    async fn fetch_diagnostics(&self) -> Vec<DiagnosticCode>;

    /// Ask the assistant. Fails with `Assistant` on transport, status or body failure.
    async fn post_question(&self, question: &str) -> GatewayResult<ChatAnswer>;
}

#[derive(Deserialize)]
struct PidsResponse {
    // A `null` description keeps its PID with an empty label.
    #[serde(default)]
    supported: Option<BTreeMap<String, Option<String>>>,
}

#[derive(Deserialize)]
struct DiagnosticsResponse {
    #[serde(default)]
    dtcs: Option<Vec<DiagnosticCode>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    answer: Option<String>,
    // `null` tips are skipped.
    #[serde(default)]
    tips: Option<Vec<Option<String>>>,
}

/// reqwest-based gateway against the backend base URL.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create with an explicit base URL (trailing slashes are ignored) and request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AssistConfig) -> GatewayResult<Self> {
        Self::new(config.backend_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET + status check + JSON decode. Transport and status failures are `Connectivity`,
    /// body failures are `Decode`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = self.url(path);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Connectivity(format!("{}: {}", url, e)))?;
        if !res.status().is_success() {
            return Err(GatewayError::Connectivity(format!("{} returned {}", url, res.status())));
        }
        res.json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn fetch_pid_catalog(&self) -> PidCatalog {
        match self.get_json::<PidsResponse>(PIDS_PATH).await {
            Ok(body) => body
                .supported
                .unwrap_or_default()
                .into_iter()
                .map(|(pid, description)| (pid, description.unwrap_or_default()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "PID catalog unavailable, showing none");
                PidCatalog::new()
            }
        }
    }

    async fn fetch_live_snapshot(&self) -> GatewayResult<LiveSnapshot> {
        self.get_json::<LiveSnapshot>(LIVE_PATH)
            .await
            .map_err(|e| match e {
                GatewayError::Connectivity(_) => e,
                other => GatewayError::Connectivity(other.to_string()),
            })
    }

    async fn fetch_diagnostics(&self) -> Vec<DiagnosticCode> {
        match self.get_json::<DiagnosticsResponse>(DIAGNOSTICS_PATH).await {
            Ok(body) => body.dtcs.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Diagnostics scan failed, showing no codes");
                Vec::new()
            }
        }
    }

    async fn post_question(&self, question: &str) -> GatewayResult<ChatAnswer> {
        let url = self.url(CHAT_PATH);
        debug!(question = %question, "Posting question to assistant");
        let res = self
            .client
            .post(&url)
            .json(&ChatRequest { question })
            .send()
            .await
            .map_err(|e| GatewayError::Assistant(format!("{}: {}", url, e)))?;
        if !res.status().is_success() {
            return Err(GatewayError::Assistant(format!("{} returned {}", url, res.status())));
        }
        let body: ChatResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::Assistant(format!("{}: {}", url, e)))?;
        Ok(ChatAnswer {
            answer: body.answer.unwrap_or_default(),
            tips: body.tips.unwrap_or_default().into_iter().flatten().collect(),
        })
    }
}
