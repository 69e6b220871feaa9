//! Response pipeline: turns a prompt into one provider call and publishes the
//! outcome into a single observable slot.
//!
//! The slot is a [`watch`] channel. The pipeline is its only writer; front ends
//! hold read-only receivers and re-render whenever it changes.

use crate::error::ChatError;
use crate::provider::{Completion, CompletionRequest, SharedProvider};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Logged (and displayed) in place of an empty completion.
pub const NO_RESPONSE: &str = "No response";

/// Which completion may overwrite the slot when calls overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Only the result of the most recent submission is published.
    #[default]
    LastSubmission,
    /// Every result is published; whichever finishes last wins.
    LastCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnState {
    Awaiting,
    Received(Completion),
    Failed(ChatError),
}

/// The single prompt/response pair shown on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Submission number; 0 until the first submit.
    pub seq: u64,
    pub prompt: String,
    pub state: TurnState,
}

impl Default for ChatTurn {
    fn default() -> Self {
        Self {
            seq: 0,
            prompt: String::new(),
            state: TurnState::Awaiting,
        }
    }
}

impl ChatTurn {
    pub fn response_text(&self) -> Option<&str> {
        match &self.state {
            TurnState::Received(c) => Some(&c.text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub model: String,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub ordering: OrderingPolicy,
}

/// A submitted call. Dropping it does not cancel the call.
#[derive(Debug)]
pub struct Submission {
    pub seq: u64,
    handle: JoinHandle<Result<Completion, ChatError>>,
}

impl Submission {
    /// Wait for this call's own outcome, whether or not it was published.
    pub async fn wait(self) -> Result<Completion, ChatError> {
        self.handle
            .await
            .unwrap_or_else(|e| Err(ChatError::Internal(e.to_string())))
    }
}

#[derive(Clone)]
pub struct ResponsePipeline {
    inner: Arc<Inner>,
}

struct Inner {
    provider: SharedProvider,
    cfg: PipelineConfig,
    slot: watch::Sender<ChatTurn>,
    /// Seq of the most recent submission. Only written while the slot is locked.
    latest: AtomicU64,
    last_prompt: Mutex<Option<String>>,
}

impl ResponsePipeline {
    pub fn new(provider: SharedProvider, cfg: PipelineConfig) -> Self {
        let (slot, _) = watch::channel(ChatTurn::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                cfg,
                slot,
                latest: AtomicU64::new(0),
                last_prompt: Mutex::new(None),
            }),
        }
    }

    pub fn model(&self) -> &str {
        &self.inner.cfg.model
    }

    pub fn provider_name(&self) -> &'static str {
        self.inner.provider.name()
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.inner.cfg.ordering
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatTurn> {
        self.inner.slot.subscribe()
    }

    pub fn current(&self) -> ChatTurn {
        self.inner.slot.borrow().clone()
    }

    /// Send `prompt` unmodified to the provider without blocking the caller.
    ///
    /// The slot moves to `Awaiting` for the new prompt right away. Must be
    /// called from within a tokio runtime.
    pub fn submit(&self, prompt: impl Into<String>) -> Submission {
        let prompt = prompt.into();
        let inner = Arc::clone(&self.inner);

        let mut seq = 0;
        inner.slot.send_modify(|turn| {
            seq = inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *turn = ChatTurn {
                seq,
                prompt: prompt.clone(),
                state: TurnState::Awaiting,
            };
        });
        *inner.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.clone());

        tracing::debug!(seq, model = %inner.cfg.model, prompt_len = prompt.len(), "submitting prompt");

        let handle = tokio::spawn(async move {
            let req = CompletionRequest {
                model: inner.cfg.model.clone(),
                prompt: prompt.clone(),
            };
            // Run the call in its own task so a panicking provider still
            // ends in a published failure.
            let provider = Arc::clone(&inner.provider);
            let mut call = tokio::spawn(async move { provider.generate(req).await });
            let joined = match inner.cfg.timeout {
                Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        call.abort();
                        Ok(Err(ChatError::Timeout(limit)))
                    }
                },
                None => call.await,
            };
            let result = joined.unwrap_or_else(|e| Err(ChatError::Internal(e.to_string())));

            match &result {
                Ok(c) => {
                    let text = if c.text.is_empty() { NO_RESPONSE } else { c.text.as_str() };
                    tracing::debug!(seq, finish_reason = ?c.finish_reason, text, "completion received");
                }
                Err(e) => tracing::warn!(seq, error = %e, "completion failed"),
            }

            inner.publish(seq, prompt, &result);
            result
        });

        Submission { seq, handle }
    }

    /// Submit the most recent prompt again. `None` if nothing was ever sent.
    pub fn resubmit(&self) -> Option<Submission> {
        let prompt = self
            .inner
            .last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;
        Some(self.submit(prompt))
    }
}

impl Inner {
    fn publish(&self, seq: u64, prompt: String, result: &Result<Completion, ChatError>) -> bool {
        self.slot.send_if_modified(|turn| {
            let latest = self.latest.load(Ordering::SeqCst);
            if self.cfg.ordering == OrderingPolicy::LastSubmission && seq != latest {
                tracing::debug!(seq, latest, "dropping stale completion");
                return false;
            }
            let state = match result {
                Ok(c) => TurnState::Received(c.clone()),
                Err(e) => TurnState::Failed(e.clone()),
            };
            *turn = ChatTurn { seq, prompt, state };
            true
        })
    }
}
