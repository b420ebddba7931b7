//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::transport::Method;

/// Keyline - key-serialized requests and priority-ordered notifications
#[derive(Parser)]
#[command(
    name = "kl",
    about = "Key-serialized request dispatcher and notification router",
    version,
    after_help = "Logs are written to: ~/.local/share/keyline/logs/keyline.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Dispatch records from a JSON-lines file through YAML-defined listeners
    Route {
        /// Listener definitions (YAML)
        #[arg(short, long)]
        listeners: PathBuf,

        /// Records, one JSON object per line
        records: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Send requests through the dispatcher
    Send {
        /// Request urls, sent in order
        #[arg(required = true)]
        urls: Vec<String>,

        /// Serialization key for every request
        #[arg(short, long)]
        key: Option<String>,

        /// JSON object payload
        #[arg(short, long)]
        data: Option<String>,

        /// HTTP method
        #[arg(short, long)]
        method: Option<Method>,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for route results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Default log file location
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keyline")
        .join("logs")
        .join("keyline.log")
}
