//! Oracle chat endpoint client with SSE streaming support.

use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use dl_protocol::{ChatRequest, StreamEvent};

use crate::sse::{decode_stream, error_message, SseFrame};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

/// Connection settings for [`OracleClient`].
#[derive(Debug, Clone)]
pub struct OracleOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Client for the Oracle chat endpoint.
pub struct OracleClient {
    endpoint: String,
    api_key: String,
    http: Client,
}

/// Body returned instead of a stream when the endpoint declines to answer.
#[derive(Debug, Deserialize)]
struct RestrictedBody {
    #[serde(default)]
    restricted: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

fn build_http_client(options: &OracleOptions) -> Result<Client, OracleError> {
    Ok(Client::builder()
        .timeout(options.timeout)
        .connect_timeout(options.connect_timeout)
        .pool_max_idle_per_host(2)
        .build()?)
}

impl OracleClient {
    /// Create a client for `endpoint` authenticated with a bearer token.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, OracleError> {
        Self::with_options(endpoint, api_key, &OracleOptions::default())
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        options: &OracleOptions,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            http: build_http_client(options)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a chat turn and return its events.
    ///
    /// The stream always ends with exactly one terminal event (`Done` or
    /// `Error`). Dropping it mid-turn closes the connection.
    pub fn send(&self, request: &ChatRequest) -> impl Stream<Item = StreamEvent> + Send + 'static {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let request = request.clone();

        stream! {
            debug!(endpoint = %endpoint, messages = request.messages.len(), "POST chat turn");
            let result = http
                .post(&endpoint)
                .bearer_auth(&api_key)
                .header(ACCEPT, "text/event-stream")
                .json(&request)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let mut events = Box::pin(events_from_response(response));
                    while let Some(event) = events.next().await {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            break;
                        }
                    }
                }
                Err(e) => {
                    yield StreamEvent::Error(OracleError::from(e).to_string());
                }
            }
        }
    }
}

/// Turn an HTTP response into chat events.
///
/// A non-success status is reported without reading a stream. A JSON
/// success body is the restricted path. Anything else is decoded as SSE.
pub fn events_from_response(response: Response) -> impl Stream<Item = StreamEvent> + Send + 'static {
    stream! {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = api_error(status, &body);
            warn!(%status, "chat endpoint returned an error");
            yield StreamEvent::Error(err.to_string());
            return;
        }

        if is_json(&response) {
            match response.json::<RestrictedBody>().await {
                Ok(body) => {
                    if let Some(error) = body.error.as_ref() {
                        yield StreamEvent::Error(error_message(error));
                        return;
                    }
                    if !body.restricted {
                        debug!("JSON body without restricted flag");
                    }
                    yield StreamEvent::Restricted(body.message.unwrap_or_default());
                    yield StreamEvent::Done;
                }
                Err(e) => {
                    yield StreamEvent::Error(OracleError::from(e).to_string());
                }
            }
            return;
        }

        let mut frames = decode_stream(Box::pin(response.bytes_stream()));
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(SseFrame::Delta(text)) => yield StreamEvent::TextDelta(text),
                Ok(SseFrame::Error(message)) => {
                    yield StreamEvent::Error(message);
                    return;
                }
                Ok(SseFrame::Done) => break,
                Err(e) => {
                    yield StreamEvent::Error(format!("Stream error: {e}"));
                    return;
                }
            }
        }

        yield StreamEvent::Done;
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Build the error for a non-success response, preferring the body's `error`.
fn api_error(status: StatusCode, body: &str) -> OracleError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").map(error_message))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });
    OracleError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_protocol::PortfolioSnapshot;

    fn response(status: u16, content_type: &str, body: &'static str) -> Response {
        let http_response = http::Response::builder()
            .status(status)
            .header("content-type", content_type)
            .body(body)
            .unwrap();
        Response::from(http_response)
    }

    async fn collect(response: Response) -> Vec<StreamEvent> {
        events_from_response(response).collect().await
    }

    #[tokio::test]
    async fn streamed_success() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n\
                    data: [DONE]\n\n";
        let events = collect(response(200, "text/event-stream", body)).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Hello".to_string()),
                StreamEvent::TextDelta(" world".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn stream_without_sentinel_still_completes() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n";
        let events = collect(response(200, "text/event-stream", body)).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("partial".to_string()),
                StreamEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn restricted_json_body() {
        let body = r#"{"restricted":true,"message":"That question is outside my remit."}"#;
        let events = collect(response(200, "application/json", body)).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Restricted("That question is outside my remit.".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn json_success_with_error_field() {
        let body = r#"{"error":"model overloaded"}"#;
        let events = collect(response(200, "application/json; charset=utf-8", body)).await;
        assert_eq!(events, vec![StreamEvent::Error("model overloaded".to_string())]);
    }

    #[tokio::test]
    async fn error_status_surfaces_body_error() {
        let body = r#"{"error":"invalid API key"}"#;
        let events = collect(response(401, "application/json", body)).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Error(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid API key"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_status_with_plain_body() {
        let events = collect(response(502, "text/html", "bad gateway")).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], StreamEvent::Error(msg) if msg.contains("bad gateway")));
    }

    #[tokio::test]
    async fn in_band_error_ends_stream() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                    data: {\"error\":{\"message\":\"rate limited\"}}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n";
        let events = collect(response(200, "text/event-stream", body)).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("a".to_string()),
                StreamEvent::Error("rate limited".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn broken_line_in_final_chunk_keeps_following_deltas() {
        let body = "data: {broken\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"Reserve is thin\"}}]}\n\n\
                    data: [DONE]\n\n";
        let events = collect(response(200, "text/event-stream", body)).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::TextDelta("Reserve is thin".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn api_error_prefers_error_field() {
        let err = api_error(StatusCode::BAD_REQUEST, r#"{"error":{"message":"bad snapshot"}}"#);
        assert_eq!(err.to_string(), "API error (400 Bad Request): bad snapshot");
    }

    #[test]
    fn api_error_empty_body_uses_reason() {
        let err = api_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn new_client_does_not_fail() {
        let client = OracleClient::new("https://oracle.example/v1/chat", "test-key").unwrap();
        assert_eq!(client.endpoint(), "https://oracle.example/v1/chat");
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_error() {
        let client = OracleClient::new("http://127.0.0.1:9/chat", "k").unwrap();
        let request = ChatRequest::new(vec![], PortfolioSnapshot::default());
        let events: Vec<_> = client.send(&request).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Error(_)));
    }
}
