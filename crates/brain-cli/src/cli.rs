//! CLI argument parsing for the `brain` binary.
//!
//! Flags given here override the config file and environment.

use clap::{Parser, Subcommand, ValueEnum};

use brain_types::EmbedderProvider;

/// Second Brain
///
/// Store short notes and recall them later by meaning.
#[derive(Parser, Debug)]
#[command(name = "brain")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/second-brain/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the record store directory
    #[arg(long, global = true)]
    pub storage_path: Option<String>,

    /// Override the embedding model
    #[arg(long, global = true, value_enum)]
    pub embedder: Option<EmbedderArg>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Embedder choices accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderArg {
    /// Local sentence-transformer (downloads the model on first use)
    Candle,
    /// Offline feature hashing
    Hashing,
}

impl From<EmbedderArg> for EmbedderProvider {
    fn from(arg: EmbedderArg) -> Self {
        match arg {
            EmbedderArg::Candle => EmbedderProvider::Candle,
            EmbedderArg::Hashing => EmbedderProvider::Hashing,
        }
    }
}

/// Memory commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new memory
    Add {
        /// The note (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Skip the confirmation step
        #[arg(long)]
        no_confirm: bool,
    },

    /// Search memories using natural language
    Recall {
        /// What to look for
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Number of results (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Confidence threshold 0.0-1.0 (default from config)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Show the score breakdown
        #[arg(long)]
        debug: bool,
    },

    /// List memories, newest first, or search them with a query
    List {
        /// Optional search query
        query: Vec<String>,

        /// Maximum number of results
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one memory
    Get {
        /// Full id or short id
        id: String,
    },

    /// Delete a memory
    Delete {
        /// Full id or short id
        id: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete ALL memories
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show storage statistics
    Stats,
}
