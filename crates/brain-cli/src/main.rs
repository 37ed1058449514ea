//! Second Brain
//!
//! Save short notes and recall them later by meaning.
//!
//! # Usage
//!
//! ```bash
//! brain add "passport is in the blue suitcase"
//! brain recall where is my passport [-n N] [-t THRESHOLD] [--debug]
//! brain list [QUERY] [-n N]
//! brain get <ID>
//! brain delete <ID> [-y]
//! brain clear [-y]
//! brain stats
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/second-brain/config.toml)
//! 3. Environment variables (BRAIN_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use brain_cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
