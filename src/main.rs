mod app;
mod cli;
mod config;
mod error;
mod input;
mod paths;
mod pipeline;
mod provider;
mod view;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;
use pipeline::ResponsePipeline;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let config_path = paths::config_path()?;
    let cfg = config::Config::load_optional(&config_path)?;

    let log_file = args
        .log_file
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.log_file.clone()));
    #[cfg(feature = "tui")]
    let quiet = matches!(args.cmd, Some(cli::Command::Tui));
    #[cfg(not(feature = "tui"))]
    let quiet = false;
    init_tracing(log_file.as_deref(), quiet)?;
    tracing::debug!(?config_path, ?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let provider_name = app::provider_name(&args, cfg.as_ref());
    let pipeline_cfg = app::pipeline_config(&args, cfg.as_ref());

    // One-shot mode needs a prompt before anything else is set up.
    if args.cmd.is_none() && args.prompt.is_empty() {
        anyhow::bail!("No prompt provided. Try: gemini-chat \"Hello\" or `gemini-chat chat`");
    }

    let provider = app::build_provider(&http, cfg.as_ref(), &provider_name)?;
    let pipeline = ResponsePipeline::new(provider, pipeline_cfg);
    tracing::debug!(
        provider = pipeline.provider_name(),
        model = pipeline.model(),
        ordering = ?pipeline.ordering(),
        "pipeline ready"
    );

    match args.cmd {
        Some(cli::Command::Chat) => {
            app::cmd_chat(&pipeline, tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
        }
        #[cfg(feature = "tui")]
        Some(cli::Command::Tui) => tui::run_tui(pipeline).await,
        None => app::cmd_prompt(&pipeline, args.prompt.join(" ")).await,
    }
}

/// Logs go to stderr, or to `log_file` when given. `quiet` turns logging off
/// unless RUST_LOG asks for it, for screens that own the terminal.
fn init_tracing(log_file: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
    let default = if quiet && log_file.is_none() { "off" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
