//! Server binary for praxis.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, resolves the LLM provider and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use praxis::server::{self, AppState};
use praxis::ServiceConfig;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address with a Gemini key from the environment
  GEMINI_API_KEY=... praxis

  # Use OpenAI with a specific model, listening on all interfaces
  praxis --provider openai --model gpt-4.1-mini --bind 0.0.0.0:8000

  # Allow only a deployed front end
  praxis --allow-origin https://praxis.example.edu

PROVIDER RESOLUTION:
  --provider/--model, then PRAXIS_LLM_PROVIDER + PRAXIS_MODEL, then
  GEMINI_API_KEY (gemini-2.0-flash), then OPENAI_API_KEY (gpt-4.1-nano),
  then any provider edgequake-llm detects from the environment.
  Without one the server still starts; generation endpoints answer 503.
"#;

/// Serve the Praxis content-generation API.
#[derive(Parser, Debug)]
#[command(
    name = "praxis",
    version,
    about = "Serve the Praxis content-generation API",
    long_about = "Turn uploaded PDF and text documents into slide outlines, detailed decks \
with rendered slide images, quizzes, exams and announcements, using an LLM through \
edgequake-llm (Gemini, OpenAI, Anthropic, Ollama, and OpenAI-compatible endpoints).",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PRAXIS_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "PRAXIS_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "PRAXIS_LLM_PROVIDER")]
    provider: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PRAXIS_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Characters of source text sent to the model, for every task.
    /// Default: 4000 for topics and announcements, 8000 otherwise.
    #[arg(long, env = "PRAXIS_EXCERPT_CHARS",
          value_parser = clap::value_parser!(u64).range(1..))]
    excerpt_chars: Option<u64>,

    /// TrueType/OpenType font for slide images.
    #[arg(long, env = "PRAXIS_FONT")]
    font: Option<PathBuf>,

    /// Allowed CORS origin. Repeat to allow several; replaces the defaults.
    #[arg(long = "allow-origin", env = "PRAXIS_ALLOWED_ORIGINS", value_delimiter = ',')]
    allow_origins: Vec<String>,

    /// Watermark text drawn on every slide image.
    #[arg(long, env = "PRAXIS_WATERMARK")]
    watermark: Option<String>,

    /// Maximum request body size in MiB.
    #[arg(long, env = "PRAXIS_MAX_UPLOAD_MB", default_value_t = 25,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PRAXIS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PRAXIS_QUIET")]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .bind(self.bind)
            .temperature(self.temperature)
            .max_upload_bytes(self.max_upload_mb as usize * 1024 * 1024);

        if let Some(ref model) = self.model {
            builder = builder.model(model);
        }
        if let Some(ref provider) = self.provider {
            builder = builder.provider_name(provider);
        }
        if let Some(n) = self.excerpt_chars {
            builder = builder.excerpt_chars(n as usize);
        }
        if let Some(ref font) = self.font {
            builder = builder.font_path(font);
        }
        if let Some(ref watermark) = self.watermark {
            builder = builder.watermark(watermark);
        }
        if !self.allow_origins.is_empty() {
            builder = builder.allowed_origins(self.allow_origins.iter().map(|o| o.trim()));
        }

        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.to_config()?;
    tracing::debug!("{:?}", config);

    // ── Shared state ─────────────────────────────────────────────────────
    // A missing provider is not fatal: the server starts and reports it.
    let state = AppState::from_config(config.clone());

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    server::serve(state, listener, server::shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
