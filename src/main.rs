//! # Chat Harness CLI (`chat`)
//!
//! The `chat` binary drives a single session from the command line: attach
//! content, ask a question, or start the JSON HTTP API a browser view
//! layer consumes.
//!
//! ## Usage
//!
//! ```bash
//! chat --config ./config/chat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chat sources` | Show configured endpoints and the model provider |
//! | `chat ingest <kind> <target>` | One-shot ingestion; prints the extracted size |
//! | `chat ask "<message>"` | One-shot question, optionally with attachments |
//! | `chat serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Check configuration
//! chat sources --config ./config/chat.toml
//!
//! # Attach a YouTube transcript and ask about it in one shot
//! chat ask "what is the video about?" \
//!     --youtube "https://youtube.com/watch?v=abc123"
//!
//! # Attach a PDF from disk
//! chat ask "summarize the attachment" --pdf ./notes.pdf
//!
//! # Start the HTTP API for a browser client
//! chat serve --config ./config/chat.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use chat_harness::config::{self, Config};
use chat_harness::models::{Role, SourceKind};
use chat_harness::server;
use chat_harness::session::Session;

/// Chat Harness CLI — a session-scoped content attachment and
/// conversational context engine for AI assistants.
#[derive(Parser)]
#[command(
    name = "chat",
    about = "Chat Harness — attach content to a session and converse with a model that references it",
    version,
    long_about = "Chat Harness ingests heterogeneous content (PDF documents, images, YouTube \
    transcripts, web pages) into per-kind conversational context and merges that context into \
    turn-based exchanges with a generative-language backend."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show configured ingestion endpoints and the model provider.
    Sources,

    /// Ingest one source and print the extracted content size.
    ///
    /// For `pdf` and `image` the target is a file path; for `youtube` and
    /// `document` it is a URL.
    Ingest {
        /// Source kind: `pdf`, `image`, `youtube`, or `document`.
        kind: String,

        /// File path or URL, depending on the kind.
        target: String,
    },

    /// Ask a one-shot question, optionally attaching content first.
    Ask {
        /// The message to send.
        message: String,

        /// Attach a PDF file before asking.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Attach a YouTube transcript before asking.
        #[arg(long)]
        youtube: Option<String>,

        /// Attach a web page before asking.
        #[arg(long)]
        page: Option<String>,
    },

    /// Start the JSON HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources => cmd_sources(&config),
        Commands::Ingest { kind, target } => cmd_ingest(&config, &kind, &target).await,
        Commands::Ask {
            message,
            pdf,
            youtube,
            page,
        } => cmd_ask(&config, &message, pdf, youtube, page).await,
        Commands::Serve => {
            let session = Arc::new(Session::from_config(&config)?);
            server::run_server(&config, session).await
        }
    }
}

fn cmd_sources(config: &Config) -> Result<()> {
    let endpoint_status = |endpoint: &Option<String>| match endpoint {
        Some(url) => format!("OK ({})", url),
        None => "NOT CONFIGURED".to_string(),
    };

    println!("{:<16} {}", "KIND", "STATUS");
    println!(
        "{:<16} {}",
        "pdf/image",
        endpoint_status(&config.ingestion.extract_endpoint)
    );
    println!(
        "{:<16} {}",
        "youtube",
        endpoint_status(&config.ingestion.transcript_endpoint)
    );
    println!("{:<16} OK (direct fetch)", "document");
    println!();
    println!(
        "model provider: {}{}",
        config.model.provider,
        config
            .model
            .model
            .as_deref()
            .map(|m| format!(" ({})", m))
            .unwrap_or_default()
    );

    Ok(())
}

async fn cmd_ingest(config: &Config, kind: &str, target: &str) -> Result<()> {
    let kind: SourceKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let session = Session::from_config(config)?;

    if kind.is_file() {
        let bytes = std::fs::read(target)
            .with_context(|| format!("Failed to read file: {}", target))?;
        let name = std::path::Path::new(target)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| target.to_string());
        session.submit_file(kind, &name, bytes).await?;
    } else {
        session.submit_url(kind, target).await?;
    }

    let extracted = session.context_text(kind).unwrap_or_default();
    println!("ingest {}", kind);
    println!("  extracted: {} chars", extracted.chars().count());
    println!("ok");
    Ok(())
}

async fn cmd_ask(
    config: &Config,
    message: &str,
    pdf: Option<PathBuf>,
    youtube: Option<String>,
    page: Option<String>,
) -> Result<()> {
    let session = Session::from_config(config)?;

    if let Some(path) = pdf {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        session.submit_file(SourceKind::Pdf, &name, bytes).await?;
        eprintln!("attached pdf: {}", name);
    }
    if let Some(url) = youtube {
        session.submit_url(SourceKind::Youtube, &url).await?;
        eprintln!("attached youtube transcript: {}", url);
    }
    if let Some(url) = page {
        session.submit_url(SourceKind::Document, &url).await?;
        eprintln!("attached web page: {}", url);
    }

    session.send_chat(message).await?;

    let messages = session.messages();
    let reply = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    println!("{}", reply);

    Ok(())
}
