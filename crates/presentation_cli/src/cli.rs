//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Lodestar CLI
#[derive(Debug, Parser)]
#[command(name = "lodestar-cli")]
#[command(author, version, about = "Web-grounded answers from a local model", long_about = None)]
pub struct Cli {
    /// Verbosity level, overrides the configured log filter
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ./lodestar.toml when present)
    #[arg(short, long, env = "LODESTAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search the web and print the extracted page texts
    Search {
        /// Search query
        query: String,
    },

    /// Ask the model and stream its answer
    Ask {
        /// Question or instruction
        prompt: String,

        /// Ground the answer on web search results
        #[arg(short = 's', long)]
        with_search: bool,
    },

    /// Check that the inference backend is reachable
    Health,
}

/// Log filter for a verbosity count, `None` keeps the configured filter
pub const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}
