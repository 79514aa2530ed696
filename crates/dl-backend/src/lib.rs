//! dl-backend: Oracle chat transport for docketlens.
//!
//! This crate turns the chat endpoint's streamed HTTP body into ordered
//! `StreamEvent`s: an incremental SSE decoder, the HTTP client, and mock
//! streams for tests.

pub mod mock;
pub mod oracle;
pub mod sse;

pub use mock::{MockConfig, MockResponse};
pub use oracle::{OracleClient, OracleError, OracleOptions};
pub use sse::{decode_stream, SseFrame, StreamDecoder};
