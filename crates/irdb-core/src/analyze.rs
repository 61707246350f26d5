//! Batch orchestration: fingerprint, identify and adjust every code.
//!
//! Code sets are independent once the graph is built, so they are processed
//! in parallel; each worker accumulates its own [`MatchStats`] and the
//! results are merged at the end. Analysis is best-effort throughout: no
//! single code's failure stops the batch.

use std::fmt::Write;

use rayon::prelude::*;

use crate::adjust::adjust_code;
use crate::catalog::ProtocolCatalog;
use crate::code::{Code, CodeSet};
use crate::fingerprint::Fingerprint;
use crate::matcher::MatchStats;

/// Analyzes every code of every code set, in insertion order within a set.
///
/// Mutates the graph in place (fingerprints, adjusted streams) and returns
/// the accumulated match statistics.
pub fn analyze_code_sets(catalog: &ProtocolCatalog, sets: &mut [CodeSet]) -> MatchStats {
    sets.par_iter_mut()
        .map(|set| {
            let mut stats = MatchStats::for_catalog(catalog);
            analyze_code_set(catalog, set, &mut stats);
            stats
        })
        .reduce(
            || MatchStats::for_catalog(catalog),
            |mut merged, stats| {
                merged.merge(&stats);
                merged
            },
        )
}

fn analyze_code_set(catalog: &ProtocolCatalog, set: &mut CodeSet, stats: &mut MatchStats) {
    let description = set.describe();
    tracing::debug!(set = %description, codes = set.codes.len(), "analyzing code set");
    for code in &mut set.codes {
        analyze_code(catalog, &description, code, stats);
    }
}

/// Runs one code through extraction, identification and adjustment.
pub fn analyze_code(
    catalog: &ProtocolCatalog,
    set_description: &str,
    code: &mut Code,
    stats: &mut MatchStats,
) {
    // Only the first transmission is fingerprinted; repeat streams follow
    // whatever protocol the first one identifies.
    if let Some(data) = &code.first.a {
        match Fingerprint::extract(data.stream(), code.fingerprint.carrier_freq) {
            Ok(fingerprint) => code.fingerprint = fingerprint,
            Err(error) => {
                tracing::error!(
                    line = code.line_number,
                    label = %code.label,
                    %error,
                    "fingerprint extraction failed"
                );
            }
        }
    }

    match catalog.identify(&code.fingerprint, stats) {
        Some((index, reference)) => {
            code.fingerprint.protocol = Some(index);
            tracing::debug!(
                set = set_description,
                label = %code.label,
                protocol = %reference.name,
                "protocol identified"
            );
            tracing::trace!(line = code.line_number, dump = %render_code(code), "before adjustment");
            if reference.provenance.allows_adjustment() {
                adjust_code(code, catalog);
                tracing::trace!(line = code.line_number, dump = %render_code(code), "after adjustment");
            }
        }
        None => {
            code.fingerprint.protocol = None;
            tracing::error!(
                set = set_description,
                label = %code.label,
                line = code.line_number,
                "protocol not identified"
            );
            tracing::debug!(dump = %render_code(code), "unidentified code");
        }
    }
}

/// Human-readable dump of a code's fingerprint and streams.
pub fn render_code(code: &Code) -> String {
    let fingerprint = &code.fingerprint;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "encoding {}, symbol count {}",
        fingerprint.encoding, fingerprint.symbol_count
    );
    let _ = writeln!(
        out,
        "carrier {}, duration {}, leading: {{{},{}}}, trailing: {{{},{}}}",
        fingerprint.carrier_freq,
        fingerprint.duration,
        fingerprint.leading.mark,
        fingerprint.leading.space,
        fingerprint.trailing.mark,
        fingerprint.trailing.space
    );
    let _ = writeln!(out, "repeat type: {}", code.repeat_type);
    let _ = writeln!(out, "mark  {}", fingerprint.mark);
    let _ = writeln!(out, "space {}", fingerprint.space);
    for (name, data) in [
        ("first/a", &code.first.a),
        ("first/b", &code.first.b),
        ("repeat/a", &code.repeat.a),
        ("repeat/b", &code.repeat.b),
    ] {
        if let Some(data) = data {
            let _ = writeln!(out, "{name}:{}", data.stream());
        }
    }
    out
}
