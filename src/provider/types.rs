use crate::error::ChatError;
use futures_core::future::BoxFuture;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// May be empty; an empty completion is a valid result.
    pub text: String,

    /// Finish or block reason reported by the service, if any.
    pub finish_reason: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
        }
    }
}

/// Provider interface: one prompt in, one completion out.
pub trait Provider {
    fn name(&self) -> &'static str;

    fn generate(&self, req: CompletionRequest) -> BoxFuture<'static, Result<Completion, ChatError>>;
}

pub type SharedProvider = Arc<dyn Provider + Send + Sync>;
