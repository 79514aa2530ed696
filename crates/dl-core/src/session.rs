//! Oracle conversation state and the streaming read loop.

use dl_protocol::{ChatMessage, ChatRequest, PortfolioSnapshot, Role, StreamEvent};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Streaming,
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("portfolio data is not loaded yet")]
    DataNotReady,
    #[error("a reply is still streaming")]
    Busy,
    #[error("question is empty")]
    EmptyInput,
}

/// Canned questions offered next to the free-text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QuickAction {
    Summary,
    TopExposures,
    Venues,
    Reserves,
    Litigation,
}

impl QuickAction {
    pub const ALL: [QuickAction; 5] = [
        Self::Summary,
        Self::TopExposures,
        Self::Venues,
        Self::Reserves,
        Self::Litigation,
    ];

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Summary => {
                "Give me an executive summary of the portfolio: totals, the largest categories and anything unusual."
            }
            Self::TopExposures => {
                "Review the top exposures. Which claims drive the most risk and what should we do about them?"
            }
            Self::Venues => "Which venues carry the most exposure, and where is litigation concentrated?",
            Self::Reserves => "Are reserves adequate relative to exposure and paid amounts? Flag categories that look under-reserved.",
            Self::Litigation => "Summarise litigated matters and recommend next steps for defense counsel.",
        }
    }
}

/// How a driven turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// One Oracle conversation. While streaming, the last message is the
/// assistant reply being built.
#[derive(Debug, Default)]
pub struct OracleSession {
    messages: Vec<ChatMessage>,
    status: SessionStatus,
    snapshot: Option<PortfolioSnapshot>,
    model: Option<String>,
}

impl OracleSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn set_snapshot(&mut self, snapshot: PortfolioSnapshot) {
        self.snapshot = Some(snapshot);
    }

    pub fn snapshot(&self) -> Option<&PortfolioSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_streaming(&self) -> bool {
        self.status == SessionStatus::Streaming
    }

    /// Record the user's question and open an empty assistant reply.
    ///
    /// Returns the request to send: the history up to and including the
    /// question, with the current snapshot.
    pub fn begin_turn(&mut self, input: &str) -> Result<ChatRequest, SessionError> {
        if self.is_streaming() {
            return Err(SessionError::Busy);
        }
        let snapshot = self.snapshot.clone().ok_or(SessionError::DataNotReady)?;
        let question = input.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.messages.push(ChatMessage::user(question));
        let mut request = ChatRequest::new(self.messages.clone(), snapshot);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        self.messages.push(ChatMessage::assistant(""));
        self.status = SessionStatus::Streaming;
        debug!(history = request.messages.len(), "turn started");
        Ok(request)
    }

    pub fn quick_action(&mut self, action: QuickAction) -> Result<ChatRequest, SessionError> {
        self.begin_turn(action.prompt())
    }

    /// Fold one stream event into the conversation. Returns true once the
    /// turn is over.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if !self.is_streaming() {
            debug!(?event, "event outside a streaming turn ignored");
            return true;
        }
        match event {
            StreamEvent::TextDelta(text) => {
                if let Some(reply) = self.reply_mut() {
                    reply.content.push_str(text);
                }
                false
            }
            StreamEvent::Restricted(message) => {
                if let Some(reply) = self.reply_mut() {
                    reply.content = message.clone();
                }
                false
            }
            StreamEvent::Done => {
                self.drop_empty_reply();
                self.status = SessionStatus::Idle;
                true
            }
            StreamEvent::Error(message) => {
                warn!(error = %message, "oracle turn failed");
                self.drop_empty_reply();
                self.status = SessionStatus::Failed(message.clone());
                true
            }
        }
    }

    /// Abandon the streaming turn, discarding the partial reply.
    pub fn cancel(&mut self) {
        if !self.is_streaming() {
            return;
        }
        if self.reply_mut().is_some() {
            self.messages.pop();
        }
        self.status = SessionStatus::Idle;
        debug!("turn cancelled");
    }

    /// Clear the conversation. The loaded snapshot is kept.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.status = SessionStatus::Idle;
    }

    /// Latest non-empty assistant reply.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }

    fn reply_mut(&mut self) -> Option<&mut ChatMessage> {
        self.messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant)
    }

    fn drop_empty_reply(&mut self) {
        if self.reply_mut().is_some_and(|m| m.content.is_empty()) {
            self.messages.pop();
        }
    }
}

/// Read `stream` into `session` until the turn ends or `cancel` fires.
///
/// `on_delta` sees each piece of reply text as it arrives. The stream is
/// dropped on return, which closes the underlying connection.
pub async fn drive<S, F>(
    session: &mut OracleSession,
    stream: S,
    cancel: &CancellationToken,
    mut on_delta: F,
) -> TurnOutcome
where
    S: Stream<Item = StreamEvent>,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.cancel();
                return TurnOutcome::Cancelled;
            }
            event = stream.next() => event,
        };

        let event = next.unwrap_or(StreamEvent::Done);
        if let Some(text) = event.display_text() {
            on_delta(text);
        }
        if session.apply(&event) {
            return match session.status() {
                SessionStatus::Failed(message) => TurnOutcome::Failed(message.clone()),
                SessionStatus::Idle | SessionStatus::Streaming => TurnOutcome::Completed,
            };
        }
    }
}
