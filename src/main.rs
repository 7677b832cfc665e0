//! complaint_rag CLI - main entry point
//!
//! Preprocess the complaint export, build the chunk index and ask questions.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use complaint_rag::rag::BuildOptions;
use complaint_rag::{commands, metrics, Config};
use tracing::warn;

#[derive(Parser)]
#[command(name = "complaint_rag")]
#[command(about = "Question answering over consumer complaint narratives", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML config file (defaults to ./config.yml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter and clean the raw complaint CSV
    Preprocess {
        /// Raw CSV export
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the cleaned CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample, chunk and embed the cleaned complaints into the vector store
    BuildIndex {
        /// Cleaned CSV (defaults to the configured processed path)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of complaints to sample
        #[arg(long)]
        sample_size: Option<usize>,

        /// Chunks embedded and stored per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Drop the existing index before building
        #[arg(long, default_value_t = false)]
        reset: bool,

        /// Hugging Face API token
        #[arg(long)]
        token: Option<String>,
    },

    /// Answer a single question
    Ask {
        question: String,

        /// Number of chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the answer and sources as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Hugging Face API token
        #[arg(long)]
        token: Option<String>,
    },

    /// Interactive chat
    Chat {
        /// Number of chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,

        /// Hugging Face API token
        #[arg(long)]
        token: Option<String>,
    },

    /// Show what the index contains
    Stats,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Preprocess { .. } => "preprocess",
            Commands::BuildIndex { .. } => "build_index",
            Commands::Ask { .. } => "ask",
            Commands::Chat { .. } => "chat",
            Commands::Stats => "stats",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("complaint_rag=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new()?,
    };
    config.validate()?;

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(&config, cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Preprocess { input, output } => {
            commands::preprocess::run(config, input, output)?;
        }
        Commands::BuildIndex {
            input,
            sample_size,
            batch_size,
            reset,
            token,
        } => {
            let options = BuildOptions {
                input,
                sample_size,
                batch_size,
                reset,
            };
            let token = commands::resolve_token(token, config);
            commands::build_index::run(config, token, options).await?;
        }
        Commands::Ask {
            question,
            k,
            json,
            token,
        } => {
            let token = commands::resolve_token(token, config);
            commands::ask::run(config, &question, k, token, json).await?;
        }
        Commands::Chat { k, token } => {
            let token = commands::resolve_token(token, config);
            commands::chat::run(config, k, token).await?;
        }
        Commands::Stats => {
            commands::stats::run(config).await?;
        }
    }
    Ok(())
}
