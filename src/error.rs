use std::time::Duration;
use thiserror::Error;

/// Failure of a single completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited or quota exceeded: {0}")]
    RateLimited(String),

    #[error("Gemini API error: HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid response from model provider: {0}")]
    InvalidResponse(String),

    #[error("request task failed: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user may resubmit.
    Transient,
    /// Nothing sent in this session can succeed.
    Fatal,
}

impl ChatError {
    pub fn severity(&self) -> Severity {
        match self {
            ChatError::Auth(_) => Severity::Fatal,
            _ => Severity::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == Severity::Transient
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key.
        let e = e.without_url();
        if e.is_decode() {
            ChatError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ChatError::Service {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ChatError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_is_fatal() {
        assert_eq!(ChatError::Auth("bad key".into()).severity(), Severity::Fatal);
        assert!(!ChatError::Auth("bad key".into()).is_retryable());

        for e in [
            ChatError::Network("connection refused".into()),
            ChatError::Timeout(Duration::from_secs(5)),
            ChatError::RateLimited("quota".into()),
            ChatError::Service { status: 503, message: "unavailable".into() },
            ChatError::InvalidResponse("eof".into()),
        ] {
            assert!(e.is_retryable(), "{e} should be retryable");
        }
    }

    #[test]
    fn timeout_message_names_duration() {
        let e = ChatError::Timeout(Duration::from_secs(30));
        assert_eq!(e.to_string(), "request timed out after 30s");
        let e = ChatError::Timeout(Duration::from_millis(250));
        assert_eq!(e.to_string(), "request timed out after 250ms");
    }
}
