//! Analyze command: the full import → analyze → export pipeline.

use std::path::Path;

use anyhow::{Context, Result};

use crate::Config;
use crate::commands::util::{import_and_analyze, open_output};

/// Runs the pipeline and writes the corrected database.
///
/// The statistics summary goes to stderr so the exported database can flow
/// through stdout untouched.
pub fn run(input: Option<&Path>, output: Option<&Path>, config: &Config) -> Result<()> {
    let (sets, catalog, stats) = import_and_analyze(input, config)?;

    let writer = open_output(output)?;
    irdb_db::export(writer, &sets).context("failed to export database")?;

    eprint!("{}", stats.render(&catalog));
    Ok(())
}
