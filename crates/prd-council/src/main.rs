//! prd-council: run advisor debates that converge on a PRD.
//!
//! # Usage
//!
//! ```bash
//! # Start a debate (runs the opening round and saves the session)
//! prd-council start --topic "Shared task planner for small teams"
//!
//! # Another round, optionally directing a question at one advisor
//! prd-council continue <ID> --mention "@business How should we price this?"
//!
//! # Render the PRD
//! prd-council show <ID> --format markdown
//!
//! # Local OpenAI-compatible server
//! PRD_COUNCIL_BASE_URL=http://localhost:8080 prd-council start --topic "..."
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prd_coordination::{FileSessionStore, SessionId};
use tracing::info;

use prd_council::{build_backend, ConfigOverrides, Council, CouncilConfig, OutputFormat, Provider};

/// Advisor council that debates a product idea into a PRD
#[derive(Parser, Debug)]
#[command(name = "prd-council")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    PRD_COUNCIL_CONFIG, PRD_COUNCIL_BASE_URL, PRD_COUNCIL_MODEL,\n    PRD_COUNCIL_API_KEY (or OPENAI_API_KEY / ANTHROPIC_API_KEY),\n    PRD_COUNCIL_SESSIONS_DIR, PRD_COUNCIL_TIMEOUT_SECS, RUST_LOG")]
struct Cli {
    /// Path to a TOML config file (overrides PRD_COUNCIL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Advisor backend protocol
    #[arg(long, global = true, value_enum)]
    provider: Option<Provider>,

    /// Endpoint root, e.g. http://localhost:8080
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name sent with each request
    #[arg(long, global = true)]
    model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Directory holding saved sessions
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Start a new debate and run the opening round
    Start {
        /// Product idea to debate
        #[arg(long)]
        topic: String,
    },

    /// Run the next round of a saved debate
    Continue {
        /// Session id
        id: SessionId,

        /// Direct a question at one advisor: "@<advisor> <question>"
        #[arg(long)]
        mention: Option<String>,
    },

    /// Re-run a round to revisit earlier positions
    Revisit {
        /// Session id
        id: SessionId,
    },

    /// Replace a session with a fresh debate on a new topic
    Reset {
        /// Session id
        id: SessionId,

        /// New product idea
        #[arg(long)]
        topic: String,
    },

    /// Print a saved session
    Show {
        /// Session id
        id: SessionId,

        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },

    /// Heuristic quality report for each PRD section
    Quality {
        /// Session id
        id: SessionId,
    },

    /// List saved sessions
    List,
}

impl Command {
    fn runs_rounds(&self) -> bool {
        matches!(
            self,
            Self::Start { .. } | Self::Continue { .. } | Self::Revisit { .. } | Self::Reset { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        provider: cli.provider,
        base_url: cli.base_url.clone(),
        model: cli.model.clone(),
        timeout_secs: cli.timeout_secs,
        sessions_dir: cli.sessions_dir.clone(),
    };
    let config = CouncilConfig::resolve(cli.config.as_deref(), &overrides)
        .context("failed to load configuration")?;
    info!(
        provider = %config.provider,
        model = %config.model(),
        sessions = %config.sessions_dir.display(),
        "prd-council starting"
    );

    let store = FileSessionStore::new(config.sessions_dir.clone());
    let mut council = Council::new(Box::new(store), config.debate.clone());
    if cli.command.runs_rounds() {
        council = council.with_backend(build_backend(&config)?);
    }

    let output = match cli.command {
        Command::Start { topic } => council.start(&topic).await?,
        Command::Continue { id, mention } => council.continue_session(&id, mention.as_deref()).await?,
        Command::Revisit { id } => council.revisit(&id).await?,
        Command::Reset { id, topic } => council.reset(&id, &topic).await?,
        Command::Show { id, format } => council.show(&id, format).await?,
        Command::Quality { id } => council.quality(&id).await?,
        Command::List => council.list().await?,
    };
    print!("{output}");
    Ok(())
}
