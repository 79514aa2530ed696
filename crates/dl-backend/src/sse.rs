//! Incremental decoder for chat-completion style Server-Sent Events.
//!
//! The chat endpoint frames its body as `data: {json}\n\n` lines, with
//! optional `:` keep-alive comments and a terminal `data: [DONE]`. Network
//! chunks may split a line, a JSON token, or a multi-byte UTF-8 sequence
//! anywhere; [`StreamDecoder`] reassembles them and yields text deltas in
//! arrival order.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

const DATA_FIELD: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// A logical unit decoded from one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Incremental assistant text.
    Delta(String),
    /// An error object delivered in-band by the endpoint.
    Error(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Outcome of decoding a single complete line.
enum LineOutcome {
    Skip,
    Frame(SseFrame),
    Done,
    /// Looked like an event but the JSON did not parse. The caller restores it.
    Unparsed,
}

// Chunk schema: {"choices":[{"delta":{"content":"..."}}]} or {"error":...}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Stateful decoder owned by a single response read loop.
///
/// After every [`feed`](Self::feed) the buffer holds at most one trailing
/// partial line, or a restored line that failed to parse.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    /// Incomplete trailing UTF-8 sequence from the previous chunk.
    utf8_carry: Vec<u8>,
    /// Raw line restored on the previous pass, if any.
    restored: Option<String>,
    done: bool,
    dropped_lines: usize,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been decoded.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Lines discarded because they never parsed, even after a retry.
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    /// Text waiting for a line terminator (test inspection).
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Feed one network chunk and return the frames it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        let text = self.decode_utf8(chunk);
        self.buffer.push_str(&text);

        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let retried = self.restored.take();

            let line = raw.strip_suffix('\n').unwrap_or(&raw);
            let line = line.strip_suffix('\r').unwrap_or(line);

            match decode_line(line) {
                LineOutcome::Skip => {}
                LineOutcome::Frame(frame) => frames.push(frame),
                LineOutcome::Done => {
                    debug!(trailing = self.buffer.len(), "stream sentinel received");
                    self.done = true;
                    self.buffer.clear();
                    self.utf8_carry.clear();
                    frames.push(SseFrame::Done);
                    break;
                }
                LineOutcome::Unparsed => {
                    if retried.as_deref() == Some(raw.as_str()) {
                        // Same bytes failed twice: more data cannot fix a terminated line.
                        warn!(line = %line, "dropping unparseable stream line");
                        self.dropped_lines += 1;
                        continue;
                    }
                    debug!(len = raw.len(), "restoring unparsed stream line");
                    self.buffer.insert_str(0, &raw);
                    self.restored = Some(raw);
                    break;
                }
            }
        }

        frames
    }

    /// Settle lines held back for a retry once no more bytes will arrive.
    ///
    /// A restored line is dropped and the complete lines queued behind it
    /// are decoded. Call before [`finish`](Self::finish) at end of body.
    pub fn flush(&mut self) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        while self.restored.is_some() && !self.done {
            frames.extend(self.feed(&[]));
        }
        frames
    }

    /// Called when the transport reports end of body.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.utf8_carry.is_empty() {
            debug!(
                buffered = self.buffer.len(),
                carry = self.utf8_carry.len(),
                "discarding trailing stream data"
            );
        }
        self.buffer.clear();
        self.utf8_carry.clear();
        self.restored = None;
    }

    /// Decode `carry + chunk`, holding back an incomplete trailing sequence.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_carry);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.utf8_carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

fn decode_line(line: &str) -> LineOutcome {
    if line.is_empty() || line.starts_with(':') {
        return LineOutcome::Skip;
    }

    // `event:`, `id:`, `retry:` and garbage are all ignored.
    let Some(value) = line.strip_prefix(DATA_FIELD) else {
        return LineOutcome::Skip;
    };
    let value = value.trim();

    if value == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    if value.is_empty() {
        return LineOutcome::Skip;
    }

    match serde_json::from_str::<ChunkPayload>(value) {
        Ok(payload) => {
            if let Some(error) = payload.error.as_ref() {
                return LineOutcome::Frame(SseFrame::Error(error_message(error)));
            }
            let content = payload
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta)
                .and_then(|delta| delta.content);
            match content {
                Some(text) => LineOutcome::Frame(SseFrame::Delta(text)),
                None => LineOutcome::Skip,
            }
        }
        // Valid JSON of an unexpected shape carries no delta.
        Err(e) if e.is_data() => LineOutcome::Skip,
        Err(_) => LineOutcome::Unparsed,
    }
}

/// Pull a human-readable message out of an `error` value.
///
/// Accepts `"text"`, `{"message": "text"}` or anything else (rendered as JSON).
pub(crate) fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Stream wrapper that decodes frames from a byte stream.
///
/// Ends after the `[DONE]` frame without polling the inner stream again, so
/// dropping it releases the underlying connection.
pub struct DecodedStream<S> {
    inner: S,
    decoder: StreamDecoder,
    pending: VecDeque<SseFrame>,
    finished: bool,
}

impl<S> DecodedStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: StreamDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for DecodedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseFrame, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.decoder.feed(&bytes));
                    if this.decoder.is_done() {
                        this.finished = true;
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.pending.extend(this.decoder.flush());
                    this.decoder.finish();
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Create a frame stream from a byte stream.
pub fn decode_stream<S, E>(stream: S) -> DecodedStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    DecodedStream::new(stream)
}
