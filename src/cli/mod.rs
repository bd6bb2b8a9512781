//! CLI module for Eto.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Eto - question answering over YouTube transcripts
///
/// Builds a vector index over windows of transcript utterances and answers
/// questions from the closest windows with a completion model.
#[derive(Parser, Debug)]
#[command(name = "eto")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Debug mode: debug logging and HTTP request tracing
    #[arg(long, visible_alias = "dbg", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build the dataset and its index, then exit
    Build {
        /// Rebuild even if a dataset already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Answer a single question and print the sources
    Ask {
        /// The question to ask
        question: String,
    },
}

impl Cli {
    /// Log filter level from the verbosity count and debug flag.
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.debug) {
            (0, false) => "warn",
            (1, false) => "info",
            (0..=2, _) => "debug",
            _ => "trace",
        }
    }
}
