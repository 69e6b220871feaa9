use crate::error::Severity;
use crate::pipeline::{ChatTurn, TurnState, NO_RESPONSE};
use std::fmt;

pub const PLACEHOLDER: &str = "Enter a prompt and send it to me so that I can help you...";
pub const LOADING: &str = "Wait for some time...Gemini is trying its best...";

/// What the output region shows for the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseView {
    /// Nothing submitted yet.
    Placeholder,
    /// A call is in flight.
    Loading,
    Text(String),
    /// The call succeeded with no text.
    NoResponse,
    Error { message: String, retryable: bool },
}

impl ResponseView {
    pub fn from_turn(turn: &ChatTurn) -> Self {
        match &turn.state {
            TurnState::Awaiting if turn.seq == 0 => ResponseView::Placeholder,
            TurnState::Awaiting => ResponseView::Loading,
            TurnState::Received(c) if c.text.is_empty() => ResponseView::NoResponse,
            TurnState::Received(c) => ResponseView::Text(c.text.clone()),
            TurnState::Failed(e) => ResponseView::Error {
                message: e.to_string(),
                retryable: e.severity() == Severity::Transient,
            },
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ResponseView::Error { retryable: false, .. })
    }
}

impl fmt::Display for ResponseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseView::Placeholder => f.write_str(PLACEHOLDER),
            ResponseView::Loading => f.write_str(LOADING),
            ResponseView::Text(t) => f.write_str(t),
            ResponseView::NoResponse => write!(f, "({NO_RESPONSE})"),
            ResponseView::Error { message, retryable: true } => {
                write!(f, "error: {message} (retry to send again)")
            }
            ResponseView::Error { message, retryable: false } => {
                write!(f, "fatal: {message} (check your API key and restart)")
            }
        }
    }
}
