//! IR code database analyzer CLI.
//!
//! This crate provides the command-line interface over `irdb-core` and
//! `irdb-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
