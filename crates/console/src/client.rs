use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use protocol::config::ClientConfig;
use protocol::{ChatReply, QuestionRequest, CHAT_PATH, PRIVACY_PATH};

static HTTP_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// HTTP access to the chat and privacy endpoints. Cheap to clone; clones share
/// the connection pool.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim().to_string(),
            timeout: config.request_timeout_ms.map(Duration::from_millis),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat(&self, question: &str) -> anyhow::Result<ChatReply> {
        let body = self.post_question(CHAT_PATH, question).await?;
        serde_json::from_str(&body).context("chat reply is not a json object")
    }

    /// Returns the privacy payload text, still to be normalized.
    pub async fn analyze_privacy(&self, name: &str) -> anyhow::Result<String> {
        let body = self.post_question(PRIVACY_PATH, name).await?;
        Ok(payload_text(&body))
    }

    async fn post_question(&self, path: &str, question: &str) -> anyhow::Result<String> {
        let request_id = HTTP_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let url = join_base_path(&self.base_url, path)?;
        tracing::debug!(
            event = "http.request",
            id = request_id,
            url = %url,
            question_len = question.len(),
            "posting question"
        );
        let mut request = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&QuestionRequest::new(question));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("request #{request_id} to {url} failed"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("request #{request_id} to {url}: failed to read body"))?;
        tracing::debug!(
            event = "http.response",
            id = request_id,
            status = %status,
            body_len = body.len(),
            "response received"
        );
        if !status.is_success() {
            anyhow::bail!(
                "request #{request_id} to {url} failed status={status} body={}",
                escape_log_body(&body)
            );
        }
        Ok(body)
    }
}

/// The privacy endpoint answers with a JSON string literal. Decode that one
/// layer when present; any other body is passed on as received.
pub fn payload_text(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        _ => body.to_string(),
    }
}

pub fn join_base_path(base: &str, path: &str) -> anyhow::Result<String> {
    if base.trim().is_empty() {
        anyhow::bail!("base_url is empty");
    }
    let normalized_base = base.trim().trim_end_matches('/');
    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("{normalized_base}{normalized_path}"))
}

fn escape_log_body(body: &str) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    body.replace('\n', "\\n").replace('\r', "\\r")
}
