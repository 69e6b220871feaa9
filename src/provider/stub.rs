use super::{Completion, CompletionRequest, Provider};
use crate::error::ChatError;
use futures_core::future::BoxFuture;
use std::time::Duration;

/// Offline provider that echoes the prompt after a short delay.
#[derive(Debug, Clone)]
pub struct StubProvider {
    delay: Duration,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(400))
    }
}

impl StubProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn generate(&self, req: CompletionRequest) -> BoxFuture<'static, Result<Completion, ChatError>> {
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(Completion::text(format!(
                "[stub provider, model: {}]\nYou said: {}",
                req.model, req.prompt
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt() {
        let p = StubProvider::new(Duration::ZERO);
        let c = p
            .generate(CompletionRequest {
                model: "gemini-pro".into(),
                prompt: "Hello".into(),
            })
            .await
            .unwrap();
        assert_eq!(c.text, "[stub provider, model: gemini-pro]\nYou said: Hello");
    }
}
