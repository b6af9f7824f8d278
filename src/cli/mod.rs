//! CLI module for quire
//!
//! Provides command-line interface parsing for the quire-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quire - answer questions about a document
#[derive(Parser, Debug)]
#[command(
    name = "quire-server",
    version,
    about = "Quire - retrieval-augmented question answering over a document",
    long_about = "Indexes a document into overlapping chunks and serves a JSON chat endpoint\n\
                  that answers questions from the most relevant chunks.\n\n\
                  Run without arguments to start the server, 'index' to build the index,\n\
                  or 'init' to write a starter configuration.",
    after_help = "EXAMPLES:\n    \
                  quire-server init               # Write a starter quire.toml\n    \
                  quire-server index              # Build the index from rag.document_path\n    \
                  quire-server                    # Start the server (requires quire.toml)\n    \
                  quire-server --config my.toml   # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "quire.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Build the index from the configured document
    ///
    /// Reads rag.document_path, embeds every chunk and writes the snapshot
    /// to rag.index_path. An existing index is only replaced on success.
    Index,

    /// Show configuration information
    Config {
        /// Validate the configuration file, including credential env vars
        #[arg(long)]
        validate: bool,
    },

    /// Write a starter quire.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
