//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use colmatch::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Candidates { input, top_k } => println!("{input} {top_k:?}"),
//!     _ => {}
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to config.yaml. Defaults to the per-platform config directory.
    #[arg(long, short = 'c', global = true, env = "COLMATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Rank catalog columns for a free-text phrase and print the result as JSON.
    #[clap(name = "candidates", alias = "c")]
    Candidates {
        /// The phrase to match, e.g. "얼마를 기부했나요".
        input: String,

        /// Number of candidates to return (1-20). Defaults to `default_top_k` from the config.
        #[arg(long = "top-k", short = 'k', allow_negative_numbers = true)]
        top_k: Option<i64>,
    },

    /// Regenerate every column embedding from the current descriptions.
    #[clap(name = "update-embeddings", alias = "u")]
    UpdateEmbeddings,

    /// Check that the embedding model loads and answers.
    Health,

    /// Replace the column descriptions with a seed set.
    Seed {
        /// YAML seed file. Without it the built-in donation catalog is used.
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },

    /// Write a default config.yaml to the config directory.
    Init,
}
