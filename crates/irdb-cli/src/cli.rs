//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// IR code database analyzer.
///
/// Classifies raw infrared timing captures into known transmission protocols
/// and normalizes noisy measured timings onto canonical protocol values.
#[derive(Debug, Parser)]
#[command(name = "irdb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a database, analyze every code and export the corrected
    /// database. Statistics are reported on stderr.
    Analyze {
        /// Input database file (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output database file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import and analyze a database, printing only the per-protocol match
    /// statistics.
    Stats {
        /// Input database file (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Import and analyze a database, dumping each code's fingerprint.
    Show {
        /// Input database file (defaults to stdin).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only show codes from this code set.
        #[arg(long)]
        set: Option<u32>,
    },
}
