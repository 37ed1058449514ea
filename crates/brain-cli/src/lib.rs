//! Library side of the `brain` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (add, recall, list, get, delete, clear, stats)
//! - `render`: Relative times, previews and score labels

pub mod cli;
pub mod commands;
pub mod render;

pub use cli::{Cli, Commands, EmbedderArg};
pub use commands::{confirm, dispatch, load_settings, open_engine, run};
