//! Events produced by one Oracle chat turn.

/// Events emitted while a chat response is streamed.
///
/// This is the closed set downstream code matches on. Wire-level details
/// (SSE framing, JSON shapes, HTTP status) are decoded into one of these
/// variants at the backend boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A chunk of assistant text, in arrival order.
    TextDelta(String),

    /// The endpoint declined to answer and returned this message instead
    /// of a stream. Not an error.
    Restricted(String),

    /// The turn completed successfully.
    Done,

    /// Transport or API failure. Terminal for the turn.
    Error(String),
}

impl StreamEvent {
    /// Returns true if no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }

    /// Text to show the user: a reply delta or a restricted message.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta(s) | Self::Restricted(s) => Some(s.as_str()),
            Self::Done | Self::Error(_) => None,
        }
    }
}
