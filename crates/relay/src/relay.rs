use std::sync::Arc;

use anyhow::Context;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;

use protocol::config::is_http_url;
use protocol::RelayErrorBody;

pub(crate) const SEND_MESSAGE_ROUTE: &str = "/api/send-message";

#[derive(Clone)]
pub(crate) struct RelayState {
    http: reqwest::Client,
    upstream_url: Arc<str>,
}

impl RelayState {
    pub(crate) fn new(upstream_url: &str) -> anyhow::Result<Self> {
        let upstream_url = upstream_url.trim();
        if !is_http_url(upstream_url) {
            anyhow::bail!("upstream url must start with http:// or https://, got {upstream_url}");
        }
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            upstream_url: Arc::from(upstream_url),
        })
    }
}

pub(crate) fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(SEND_MESSAGE_ROUTE, post(send_message))
        .with_state(state)
        .layer(middleware::from_fn(log_http_request))
}

async fn health() -> &'static str {
    "ok"
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;
    let status = response.status();
    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        "http request"
    );
    response
}

/// Forwards the JSON body upstream and returns the upstream JSON as is. Any
/// failure, including an unreadable request body, maps to a 500 with a fixed
/// error body.
async fn send_message(State(state): State<RelayState>, body: Bytes) -> Response {
    match forward(&state, &body).await {
        Ok(data) => Json(data).into_response(),
        Err(err) => {
            tracing::error!(
                event = "relay.upstream_failed",
                upstream = %state.upstream_url,
                error = %format!("{err:#}"),
                "error fetching upstream"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RelayErrorBody::fetch_failed()),
            )
                .into_response()
        }
    }
}

async fn forward(state: &RelayState, body: &[u8]) -> anyhow::Result<Value> {
    let payload: Value = serde_json::from_slice(body).context("request body is not json")?;
    tracing::info!(
        event = "relay.forward",
        upstream = %state.upstream_url,
        body = %payload,
        "forwarding request"
    );
    let response = state
        .http
        .post(&*state.upstream_url)
        .json(&payload)
        .send()
        .await
        .context("upstream request failed")?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("API request failed with status {status}");
    }
    response
        .json::<Value>()
        .await
        .context("upstream response is not json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn_relay(upstream_url: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = router(RelayState::new(upstream_url).expect("state"));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    async fn post_raw(relay: &str, body: &str) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("{relay}{SEND_MESSAGE_ROUTE}"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("send");
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.expect("json body");
        (status, body)
    }

    #[test]
    fn rejects_non_http_upstream() {
        assert!(RelayState::new("ftp://example.com").is_err());
        assert!(RelayState::new("").is_err());
    }

    #[tokio::test]
    async fn forwards_body_and_returns_upstream_json() {
        let upstream = MockServer::start().await;
        let request = json!({ "input": { "topic": "phishing", "level": 2 } });
        Mock::given(method("POST"))
            .and(path("/quiz/invoke"))
            .and(header("content-type", "application/json"))
            .and(body_json(request.clone()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "output": { "questions": [] } })),
            )
            .expect(1)
            .mount(&upstream)
            .await;
        let relay = spawn_relay(&format!("{}/quiz/invoke", upstream.uri())).await;

        let (status, body) = post_raw(&relay, &request.to_string()).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "output": { "questions": [] } }));
    }

    #[tokio::test]
    async fn upstream_error_maps_to_fixed_failure() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&upstream)
            .await;
        let relay = spawn_relay(&upstream.uri()).await;

        let (status, body) = post_raw(&relay, r#"{"input":"x"}"#).await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({ "error": "Failed to fetch" }));
    }

    #[tokio::test]
    async fn non_json_upstream_maps_to_fixed_failure() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&upstream)
            .await;
        let relay = spawn_relay(&upstream.uri()).await;

        let (status, body) = post_raw(&relay, "{}").await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({ "error": "Failed to fetch" }));
    }

    #[tokio::test]
    async fn unreachable_upstream_maps_to_fixed_failure() {
        let relay = spawn_relay("http://127.0.0.1:9/quiz/invoke").await;

        let (status, body) = post_raw(&relay, r#"{"input":"x"}"#).await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({ "error": "Failed to fetch" }));
    }

    #[tokio::test]
    async fn invalid_request_body_never_reaches_upstream() {
        let upstream = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&upstream)
            .await;
        let relay = spawn_relay(&upstream.uri()).await;

        let (status, body) = post_raw(&relay, "not json").await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({ "error": "Failed to fetch" }));
    }

    #[tokio::test]
    async fn health_check() {
        let upstream = MockServer::start().await;
        let relay = spawn_relay(&upstream.uri()).await;
        let body = reqwest::get(format!("{relay}/health"))
            .await
            .expect("send")
            .text()
            .await
            .expect("text");
        assert_eq!(body, "ok");
    }
}
