//! Show command: dump each code's fingerprint after analysis.

use std::path::Path;

use anyhow::Result;

use irdb_core::render_code;

use crate::Config;
use crate::commands::util::import_and_analyze;

/// Prints every analyzed code's fingerprint and streams, optionally
/// filtered to one code set.
pub fn run(input: Option<&Path>, set_filter: Option<u32>, config: &Config) -> Result<()> {
    let (sets, catalog, _stats) = import_and_analyze(input, config)?;

    for set in &sets {
        if set_filter.is_some_and(|id| id != set.id) {
            continue;
        }
        for code in &set.codes {
            let protocol = code
                .fingerprint
                .protocol
                .and_then(|index| catalog.get(index))
                .map_or("### not identified ###", |reference| {
                    reference.name.as_str()
                });
            println!(
                "set {} - {} - protocol: {protocol}",
                set.describe(),
                code.label
            );
            print!("{}", render_code(code));
            println!();
        }
    }
    Ok(())
}
