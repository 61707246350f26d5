//! Stats command: analyze and report match statistics only.

use std::path::Path;

use anyhow::Result;

use crate::Config;
use crate::commands::util::import_and_analyze;

/// Prints the per-protocol match summary for a database.
pub fn run(input: Option<&Path>, config: &Config) -> Result<()> {
    let (_sets, catalog, stats) = import_and_analyze(input, config)?;
    print!("{}", stats.render(&catalog));
    Ok(())
}
