//! CLI module for taggr - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for one-off dispatches,
//! batch labeling, model listing, and configuration checks.

pub mod commands;

pub use commands::Cli;
