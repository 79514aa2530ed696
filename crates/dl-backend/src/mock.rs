//! Mock chat backend for testing.
//!
//! Produces the same `StreamEvent` sequences as [`crate::OracleClient`], and
//! raw SSE bodies split at arbitrary byte offsets for decoder-level tests.

use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use futures::Stream;
use tokio::time::sleep;
use dl_protocol::StreamEvent;

/// Configurable mock responses for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit a text delta.
    Text { content: String },
    /// Emit a restricted reply (the endpoint declined).
    Restricted { message: String },
    /// Emit an error. The stream ends after it.
    Error { message: String },
    /// Delay before next event (for cancellation tests).
    Delay { ms: u64 },
}

/// Configuration for mock stream.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of responses to emit.
    pub responses: Vec<MockResponse>,
    /// Optional delay between each event (ms).
    pub chunk_delay_ms: Option<u64>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }
}

/// Create a stream of StreamEvents from mock config.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = StreamEvent> + Send + 'static {
    stream! {
        for response in config.responses {
            if let Some(delay_ms) = config.chunk_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match response {
                MockResponse::Text { content } => {
                    yield StreamEvent::TextDelta(content);
                }
                MockResponse::Restricted { message } => {
                    yield StreamEvent::Restricted(message);
                }
                MockResponse::Error { message } => {
                    yield StreamEvent::Error(message);
                    return;
                }
                MockResponse::Delay { ms } => {
                    sleep(Duration::from_millis(ms)).await;
                }
            }
        }

        yield StreamEvent::Done;
    }
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    /// Stream the given chunks as text deltas.
    pub fn streaming_text(chunks: &[&str]) -> MockConfig {
        let responses = chunks
            .iter()
            .map(|chunk| MockResponse::Text {
                content: (*chunk).to_string(),
            })
            .collect();

        MockConfig::new().with_responses(responses)
    }

    /// A declined answer.
    pub fn restricted(message: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![MockResponse::Restricted {
            message: message.to_string(),
        }])
    }

    /// Some text, then a failure.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: text_before.to_string(),
            },
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }

    /// Encode deltas as a chat-completion SSE body ending in `[DONE]`.
    pub fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let payload = serde_json::json!({
                "object": "chat.completion.chunk",
                "choices": [{"index": 0, "delta": {"content": delta}}],
            });
            body.push_str(&format!("data: {payload}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    /// Split `body` into chunks of the given byte sizes (cycled). Splits may
    /// land inside a multi-byte character.
    pub fn chunked(body: &[u8], sizes: &[usize]) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        let mut offset = 0;
        let mut sizes = sizes.iter().copied().filter(|s| *s > 0).cycle();
        while offset < body.len() {
            let size = sizes.next().unwrap_or(body.len());
            let end = (offset + size).min(body.len());
            chunks.push(Bytes::copy_from_slice(&body[offset..end]));
            offset = end;
        }
        chunks
    }

    /// A byte stream suitable for [`crate::sse::decode_stream`].
    pub fn byte_stream(
        chunks: Vec<Bytes>,
    ) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Unpin + Send {
        futures::stream::iter(chunks.into_iter().map(Ok))
    }
}
