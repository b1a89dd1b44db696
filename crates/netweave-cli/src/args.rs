//! Command-line argument definitions for the Netweave CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, the configuration
//! file, the shape library, and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Netweave network compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input diagram (sub-network or super-network)
    #[arg(help = "Path to the input drawing")]
    pub input: String,

    /// Path to the output TOML network model
    #[arg(short, long, default_value = "network.toml")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the shape-library catalog (TOML), overriding `[library] path`
    #[arg(short, long)]
    pub library: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
