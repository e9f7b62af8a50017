//! CLI command definitions and dispatch.

pub mod publish;
pub mod stats;
pub mod token;

use clap::{Parser, Subcommand};

use eventhub_core::config::AppConfig;
use eventhub_core::error::AppError;

use crate::output::OutputFormat;

/// EventHub gateway tooling
#[derive(Debug, Parser)]
#[command(name = "eventhub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay to merge over `config/default`
    #[arg(short, long, env = "EVENTHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Publish a notification on the bus
    Publish(publish::PublishArgs),
    /// Issue an access token for manual socket testing
    Token(token::TokenArgs),
    /// Compute dashboard statistics
    Stats(stats::StatsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Publish(args) => publish::execute(args, &self.env).await,
            Commands::Token(args) => token::execute(args, &self.env, self.format),
            Commands::Stats(args) => stats::execute(args, &self.env, self.format).await,
        }
    }
}

/// Helper: load configuration for the selected environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}
