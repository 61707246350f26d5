//! Shared utilities for CLI commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};

use irdb_core::{CodeSet, MatchStats, ProtocolCatalog, analyze_code_sets};
use irdb_db::CodesetMapping;

use crate::Config;

/// Opens the input database: a file, or stdin when no path is given.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input file {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Opens the output database: a file, or stdout when no path is given.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// The protocol catalog: an external file when configured, otherwise the
/// builtin one.
pub fn load_catalog(config: &Config) -> Result<ProtocolCatalog> {
    match &config.catalog_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            ProtocolCatalog::from_json(&json)
                .with_context(|| format!("invalid catalog {}", path.display()))
        }
        None => Ok(ProtocolCatalog::builtin()),
    }
}

/// The codeset mapping: an external file when configured, otherwise the
/// builtin one.
pub fn load_mapping(config: &Config) -> Result<CodesetMapping> {
    match &config.codeset_mapping_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read codeset mapping {}", path.display()))?;
            CodesetMapping::from_json(&json)
                .with_context(|| format!("invalid codeset mapping {}", path.display()))
        }
        None => Ok(CodesetMapping::builtin()),
    }
}

/// Imports the database and runs the full analysis over it.
pub fn import_and_analyze(
    input: Option<&Path>,
    config: &Config,
) -> Result<(Vec<CodeSet>, ProtocolCatalog, MatchStats)> {
    let catalog = load_catalog(config)?;
    let mapping = load_mapping(config)?;

    let reader = open_input(input)?;
    let mut sets = irdb_db::import(reader, &mapping).context("failed to import database")?;
    tracing::debug!(sets = sets.len(), "database imported");

    let stats = analyze_code_sets(&catalog, &mut sets);
    Ok((sets, catalog, stats))
}
