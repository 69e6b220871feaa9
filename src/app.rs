use crate::cli::Args;
use crate::config;
use crate::error::ChatError;
use crate::pipeline::{PipelineConfig, ResponsePipeline, NO_RESPONSE};
use crate::provider::{self, SharedProvider};
use crate::view::{ResponseView, LOADING};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_MODEL: &str = "gemini-pro";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolve pipeline settings: CLI flag > config file > default.
pub fn pipeline_config(args: &Args, cfg: Option<&config::Config>) -> PipelineConfig {
    let model = args
        .model
        .clone()
        .or_else(|| cfg.and_then(|c| c.model.clone()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let timeout_secs = args
        .timeout
        .or_else(|| cfg.and_then(|c| c.request_timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let ordering = args
        .ordering
        .or_else(|| cfg.and_then(|c| c.ordering))
        .unwrap_or_default();

    PipelineConfig {
        model,
        timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        ordering,
    }
}

pub fn provider_name(args: &Args, cfg: Option<&config::Config>) -> String {
    args.provider
        .clone()
        .or_else(|| cfg.and_then(|c| c.provider.clone()))
        .unwrap_or_else(|| "google".to_string())
}

pub fn build_provider(
    http: &reqwest::Client,
    cfg: Option<&config::Config>,
    provider_name: &str,
) -> anyhow::Result<SharedProvider> {
    match provider_name {
        "google" => {
            #[cfg(feature = "google")]
            {
                let api_key = std::env::var("GEMINI_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty())
                    .or_else(|| cfg.and_then(|c| c.google.api_key.clone()));

                let Some(key) = api_key else {
                    return Err(anyhow::Error::new(ChatError::Auth("no API key".to_string())))
                        .context("set GEMINI_API_KEY or config.toml google.api_key");
                };

                let api_base = cfg.and_then(|c| c.google.api_base.as_deref());
                let p = provider::google::GoogleProvider::new(http.clone(), key, api_base)?;
                Ok(Arc::new(p))
            }
            #[cfg(not(feature = "google"))]
            {
                let _ = http;
                let _ = cfg;
                anyhow::bail!("google provider is not enabled in this build")
            }
        }
        "stub" => Ok(Arc::new(provider::stub::StubProvider::default())),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

/// Send one prompt, print the reply and exit.
pub async fn cmd_prompt(pipeline: &ResponsePipeline, prompt: String) -> anyhow::Result<()> {
    let completion = pipeline.submit(prompt).wait().await?;
    if completion.text.is_empty() {
        println!("({NO_RESPONSE})");
    } else {
        println!("{}", completion.text);
    }
    Ok(())
}

/// Line-based chat: every input line is sent as a prompt.
///
/// `/retry` resends the previous prompt, `/quit` exits. An authentication
/// failure ends the session with an error.
pub async fn cmd_chat<R, W>(pipeline: &ResponsePipeline, input: R, mut out: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    write_line(&mut out, &ResponseView::from_turn(&pipeline.current()).to_string()).await?;
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        let submission = if line == "/quit" {
            break;
        } else if line == "/retry" {
            let Some(s) = pipeline.resubmit() else {
                write_line(&mut out, "(nothing to retry)").await?;
                continue;
            };
            s
        } else {
            pipeline.submit(line)
        };

        write_line(&mut out, LOADING).await?;
        let seq = submission.seq;
        let result = submission.wait().await;

        let turn = pipeline.current();
        let view = if turn.seq == seq {
            ResponseView::from_turn(&turn)
        } else {
            // Someone else overwrote the slot; show our own outcome.
            match &result {
                Ok(c) if c.text.is_empty() => ResponseView::NoResponse,
                Ok(c) => ResponseView::Text(c.text.clone()),
                Err(e) => ResponseView::Error {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                },
            }
        };
        write_line(&mut out, &view.to_string()).await?;

        if let Err(e) = result {
            if !e.is_retryable() {
                return Err(anyhow::Error::new(e)).context("chat session ended");
            }
        }
    }

    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> anyhow::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}
