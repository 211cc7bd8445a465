//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod serve;
mod status;
mod transcribe;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "modelgate")]
#[command(about = "Rate-limited transcription and analysis with Gemini")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe an audio file (mp3, m4a, wav)
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,
        /// Write the transcript here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a transcript file as Markdown
    Summarize {
        /// Transcript text file
        file: PathBuf,
    },

    /// Answer a question about a transcript file
    Ask {
        /// Transcript text file
        file: PathBuf,
        /// Question to answer
        question: String,
    },

    /// Show rate limits and retry policy for the configured models
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the monitoring and API server
    Serve {
        /// Bind address: port, host, or host:port
        #[arg(default_value = "127.0.0.1:3030")]
        bind: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print one setting by dot-separated path (e.g. retry.max_retries)
    Get {
        /// Setting path
        setting: String,
    },
}

/// Parse arguments, load config, and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path).await?
        }
        None => Config::load().await,
    };

    match cli.command {
        Commands::Transcribe { file, output } => {
            transcribe::cmd_transcribe(&config, &file, output.as_deref()).await
        }
        Commands::Summarize { file } => transcribe::cmd_summarize(&config, &file).await,
        Commands::Ask { file, question } => {
            transcribe::cmd_ask(&config, &file, &question).await
        }
        Commands::Status { json } => status::cmd_status(&config, json).await,
        Commands::Serve { bind } => serve::cmd_serve(&config, &bind).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config),
            ConfigCommands::Get { setting } => config_cmd::cmd_config_get(&config, &setting),
        },
    }
}
