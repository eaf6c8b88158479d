//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - dispatch: run one payload through a schedule group
//! - label: label every image in a directory
//! - models: list the models a channel serves
//! - check: run configuration diagnostics

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Taggr - batch image labeling through ordered LLM fallback chains
#[derive(Parser, Debug)]
#[command(name = "taggr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the application state file (data.json)
    #[arg(short, long, global = true, default_value = "data.json")]
    pub state: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one chat payload through a schedule group's fallback chain
    Dispatch {
        /// Schedule group id
        group: String,

        /// Payload JSON file (reads stdin when omitted)
        #[arg(short, long)]
        payload: Option<PathBuf>,

        /// Minimum accepted content length, overriding global rules
        #[arg(long)]
        min_chars: Option<u32>,

        /// Maximum accepted content length, overriding global rules
        #[arg(long)]
        max_chars: Option<u32>,

        /// Override the global auto-retry setting
        #[arg(long)]
        auto_retry: Option<bool>,
    },

    /// Label every image in a directory, writing <stem>.txt sidecars
    Label {
        /// Schedule group id
        group: String,

        /// Directory of images to label
        dir: PathBuf,

        /// Prompt text sent alongside each image
        #[arg(short, long, default_value = "")]
        prompt: String,

        /// Worker pool size (defaults to the group's concurrency)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Minimum accepted content length, overriding global rules
        #[arg(long)]
        min_chars: Option<u32>,

        /// Maximum accepted content length, overriding global rules
        #[arg(long)]
        max_chars: Option<u32>,

        /// Override the global auto-retry setting
        #[arg(long)]
        auto_retry: Option<bool>,
    },

    /// List the models a channel serves
    Models {
        /// Channel id
        channel: String,
    },

    /// Check the state file for configuration problems
    Check,
}
