use crate::pipeline::OrderingPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chat with Gemini from the terminal
#[derive(Debug, Parser)]
#[command(name = "gemini-chat")]
#[command(version)]
#[command(about = "Chat with Gemini from the terminal", long_about = None)]
pub struct Args {
    /// Model name (default: config/model or "gemini-pro")
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Provider: "google" or "stub" (default: config/provider or "google")
    #[arg(long = "provider", global = true)]
    pub provider: Option<String>,

    /// Per-request timeout in seconds, 0 to wait forever
    #[arg(long = "timeout", value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Which reply is kept when requests overlap
    #[arg(long = "ordering", value_enum, global = true)]
    pub ordering: Option<OrderingPolicy>,

    /// Write logs to a file instead of stderr
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Prompt text (positional) (used when no subcommand is given)
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Line-by-line chat on stdin/stdout
    Chat,

    /// Run an interactive terminal chat UI
    #[cfg(feature = "tui")]
    Tui,
}
