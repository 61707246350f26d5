//! Protocol identification and match statistics.
//!
//! Identification is a linear first-match scan of the catalog. Leading pair
//! and duration comparisons happen in carrier-normalized units: carrier
//! frequency varies between physical captures, so raw values are divided by
//! `carrier/100` on both sides before the fuzzy comparison.

use std::fmt::Write;

use crate::catalog::{ProtocolCatalog, ReferenceProtocol};
use crate::fingerprint::Fingerprint;
use crate::histogram::durations_match;

/// Per-template match counters, kept outside the catalog so parallel workers
/// can each accumulate their own and merge at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchStats {
    matched: Vec<u64>,
    unidentified: u64,
}

impl MatchStats {
    /// Counters sized for `catalog`, all zero.
    pub fn for_catalog(catalog: &ProtocolCatalog) -> Self {
        Self {
            matched: vec![0; catalog.len()],
            unidentified: 0,
        }
    }

    /// Matches recorded for the template at `index`.
    pub fn matched(&self, index: usize) -> u64 {
        self.matched.get(index).copied().unwrap_or(0)
    }

    /// Codes no template matched.
    pub const fn unidentified(&self) -> u64 {
        self.unidentified
    }

    /// Total codes seen, identified or not.
    pub fn total(&self) -> u64 {
        self.matched.iter().sum::<u64>() + self.unidentified
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        if self.matched.len() < other.matched.len() {
            self.matched.resize(other.matched.len(), 0);
        }
        for (mine, theirs) in self.matched.iter_mut().zip(&other.matched) {
            *mine += theirs;
        }
        self.unidentified += other.unidentified;
    }

    fn record_match(&mut self, index: usize) {
        if self.matched.len() <= index {
            self.matched.resize(index + 1, 0);
        }
        self.matched[index] += 1;
    }

    /// Renders the per-protocol summary table.
    pub fn render(&self, catalog: &ProtocolCatalog) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- codes identified per protocol ---");
        for (index, protocol) in catalog.protocols().iter().enumerate() {
            let _ = writeln!(
                out,
                "{:4} codes identified as {}",
                self.matched(index),
                protocol.name
            );
        }
        let total = self.total();
        let percent = if total == 0 {
            0
        } else {
            self.unidentified * 100 / total
        };
        let _ = writeln!(
            out,
            "{:4} codes not identified out of {total} ({percent}%)",
            self.unidentified
        );
        out
    }
}

impl ProtocolCatalog {
    /// Finds the first template compatible with `fingerprint`.
    ///
    /// A template matches when the encodings are compatible, the symbol
    /// count is one of the template's declared counts, and leading mark,
    /// leading space and total duration each agree within 10% in
    /// carrier-normalized units. The match (or the lack of one) is recorded
    /// in `stats`.
    pub fn identify(
        &self,
        fingerprint: &Fingerprint,
        stats: &mut MatchStats,
    ) -> Option<(usize, &ReferenceProtocol)> {
        let Some(normalized) = NormalizedShape::of(
            fingerprint.carrier_freq,
            fingerprint.leading.mark,
            fingerprint.leading.space,
            fingerprint.duration,
        ) else {
            // Carrier never set; nothing can be compared.
            stats.unidentified += 1;
            return None;
        };

        for (index, reference) in self.protocols().iter().enumerate() {
            let Some(shape) = NormalizedShape::of(
                reference.carrier_freq,
                reference.leading.mark,
                reference.leading.space,
                reference.duration,
            ) else {
                continue;
            };

            if fingerprint.encoding.matches(reference.encoding)
                && reference.symbol_counts.contains(&fingerprint.symbol_count)
                && durations_match(shape.leading_mark, normalized.leading_mark)
                && durations_match(shape.leading_space, normalized.leading_space)
                && durations_match(shape.duration, normalized.duration)
            {
                stats.record_match(index);
                return Some((index, reference));
            }
        }

        stats.unidentified += 1;
        None
    }
}

/// Leading pair and duration of one side, in carrier-normalized units.
struct NormalizedShape {
    leading_mark: u64,
    leading_space: u64,
    duration: u64,
}

impl NormalizedShape {
    fn of(carrier_freq: u64, leading_mark: u64, leading_space: u64, duration: u64) -> Option<Self> {
        // Scaled to avoid both overflow and loss of precision.
        let carrier = carrier_freq / 100;
        if carrier == 0 {
            return None;
        }
        Some(Self {
            leading_mark: leading_mark * 1000 / carrier,
            leading_space: leading_space * 1000 / carrier,
            duration: duration * 1000 / carrier,
        })
    }
}
