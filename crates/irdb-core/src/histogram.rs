//! Period histograms with fuzzy-equality clustering.
//!
//! Measured IR timings are noisy: the same nominal symbol width arrives as a
//! spread of nearby values. A [`RawHistogram`] clusters periods as they are
//! inserted, and [`RawHistogram::normalize`] collapses residual near-duplicate
//! clusters into a final [`Histogram`] whose representative periods are the
//! occurrence-weighted averages of their members.

use std::fmt;

/// Cluster-merge tolerance, in tenths of a percent (10%).
pub const CLUSTER_TOLERANCE: u64 = 100;

/// Upper bound on distinct clusters tracked per histogram.
///
/// Degenerate high-noise captures could otherwise produce one cluster per
/// period. Once the cap is reached, further distinct periods are dropped from
/// clustering (first-come clusters win); this is a resource bound, not a
/// correctness guarantee.
pub const MAX_CLUSTERS: usize = 100;

/// One cluster of fuzzy-equal periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistEntry {
    /// Representative period of the cluster.
    pub period: u64,
    /// Number of periods merged into the cluster.
    pub count: u64,
}

/// Tests whether two values are equal within `threshold` tenths of a percent.
///
/// The test is the symmetric relative difference `2000·|a−b| / (a+b)`, so
/// `fuzzy_match(a, b, t) == fuzzy_match(b, a, t)` for all inputs. Two zeros
/// compare equal; zero against a nonzero value does not (their relative
/// difference is maximal).
pub fn fuzzy_match(a: u64, b: u64, threshold: u64) -> bool {
    if a == b {
        return true;
    }
    a.abs_diff(b).saturating_mul(2000) / (a + b) < threshold
}

/// Compares two duration-like values at 10% tolerance.
///
/// Zero means "not present" in reference templates, so a zero on either side
/// matches only another zero.
pub fn durations_match(a: u64, b: u64) -> bool {
    if a == 0 || b == 0 {
        return a == b;
    }
    fuzzy_match(a, b, CLUSTER_TOLERANCE)
}

/// Bounded scratch histogram built incrementally during stream analysis.
///
/// Entries stay sorted by representative period at all times.
#[derive(Debug, Clone, Default)]
pub struct RawHistogram {
    entries: Vec<HistEntry>,
}

impl RawHistogram {
    /// Creates an empty histogram.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no periods have been inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The clusters, in increasing period order.
    pub fn entries(&self) -> &[HistEntry] {
        &self.entries
    }

    /// Records one period.
    ///
    /// If an existing cluster's representative period is fuzzy-equal to
    /// `period` (10% tolerance), its count is bumped; otherwise a new
    /// singleton cluster is inserted at the sorted position. Beyond
    /// [`MAX_CLUSTERS`] distinct values, new clusters are silently dropped.
    pub fn insert(&mut self, period: u64) {
        for entry in &mut self.entries {
            if fuzzy_match(entry.period, period, CLUSTER_TOLERANCE) {
                entry.count += 1;
                return;
            }
        }

        if self.entries.len() >= MAX_CLUSTERS {
            return;
        }
        let at = self.entries.partition_point(|entry| entry.period < period);
        self.entries.insert(at, HistEntry { period, count: 1 });
    }

    /// Collapses residual near-duplicate clusters into a final [`Histogram`].
    ///
    /// Insertion merges each period against fixed representatives, so two
    /// clusters seeded from different runs can end up closer together than
    /// the tolerance allows. This pass walks the clusters in period order and
    /// chain-merges consecutive ones within tolerance of the previously
    /// merged cluster, replacing each run with a single cluster at the
    /// occurrence-weighted average period.
    pub fn normalize(&self) -> Histogram {
        Histogram {
            entries: collapse_runs(&self.entries),
        }
    }
}

fn collapse_runs(entries: &[HistEntry]) -> Vec<HistEntry> {
    let mut merged = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let mut reference = entries[i].period;
        let mut weighted_sum = 0u64;
        let mut total = 0u64;
        while i < entries.len() && fuzzy_match(reference, entries[i].period, CLUSTER_TOLERANCE) {
            weighted_sum += entries[i].period * entries[i].count;
            total += entries[i].count;
            reference = entries[i].period;
            i += 1;
        }
        if merged.len() < MAX_CLUSTERS {
            merged.push(HistEntry {
                period: weighted_sum / total,
                count: total,
            });
        }
    }
    merged
}

/// Normalized, ordered cluster list for one side (mark or space) of a code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    entries: Vec<HistEntry>,
}

impl Histogram {
    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the histogram holds no clusters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The clusters, in increasing period order.
    pub fn entries(&self) -> &[HistEntry] {
        &self.entries
    }

    /// Cluster at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&HistEntry> {
        self.entries.get(index)
    }

    /// Count of the cluster fuzzy-equal to `period`, or 0 if none matches.
    pub fn count_for(&self, period: u64) -> u64 {
        self.entries
            .iter()
            .find(|entry| fuzzy_match(entry.period, period, CLUSTER_TOLERANCE))
            .map_or(0, |entry| entry.count)
    }

    /// Bumps the count of the cluster fuzzy-equal to `period`, if any.
    pub fn bump_count(&mut self, period: u64) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| fuzzy_match(entry.period, period, CLUSTER_TOLERANCE))
        {
            entry.count += 1;
        }
    }

    /// Sum of all cluster counts.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.entries.len())?;
        let mut sep = ' ';
        for entry in &self.entries {
            write!(f, "{sep}{:.3}:{}", scaled_to_unit(entry.period), entry.count)?;
            sep = ',';
        }
        Ok(())
    }
}

/// Scales an unscaled period onto the fixed-point clustering domain.
///
/// The `*8+4` transform trades integer truncation error for a consistent
/// quantization baseline, so nearby raw values land on comparable scaled
/// values.
pub const fn to_scaled(period: u64) -> u64 {
    period * 8 + 4
}

/// Inverse of [`to_scaled`] for display purposes.
#[expect(
    clippy::cast_precision_loss,
    reason = "display-only conversion, periods are far below 2^52"
)]
pub fn scaled_to_unit(scaled: u64) -> f64 {
    scaled as f64 / 8.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_match_is_symmetric() {
        // Pair table exercising values around the 10% boundary.
        let pairs = [
            (10, 11),
            (14, 16),
            (15, 16),
            (17, 16),
            (18, 16),
            (100, 111),
            (168, 172),
            (0, 5),
            (0, 0),
        ];
        for (a, b) in pairs {
            assert_eq!(
                fuzzy_match(a, b, CLUSTER_TOLERANCE),
                fuzzy_match(b, a, CLUSTER_TOLERANCE),
                "asymmetric result for ({a},{b})"
            );
        }
    }

    #[test]
    fn fuzzy_match_boundary() {
        // 2000*|15-16|/31 = 64 < 100: equal. 2000*|14-16|/30 = 133: not.
        assert!(fuzzy_match(15, 16, CLUSTER_TOLERANCE));
        assert!(!fuzzy_match(14, 16, CLUSTER_TOLERANCE));
    }

    #[test]
    fn fuzzy_match_zero_pair() {
        assert!(fuzzy_match(0, 0, CLUSTER_TOLERANCE));
        assert!(!fuzzy_match(0, 100, CLUSTER_TOLERANCE));
    }

    #[test]
    fn durations_match_zero_is_reserved() {
        assert!(durations_match(0, 0));
        assert!(!durations_match(0, 342));
        assert!(!durations_match(342, 0));
        assert!(durations_match(900, 890));
    }

    #[test]
    fn insert_keeps_entries_sorted() {
        let mut hist = RawHistogram::new();
        for period in [516, 172, 8000, 172, 2740, 516, 40] {
            hist.insert(period);
        }
        let periods: Vec<u64> = hist.entries().iter().map(|e| e.period).collect();
        let mut sorted = periods.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(periods, sorted, "periods must be strictly increasing");
    }

    #[test]
    fn insert_merges_fuzzy_equal_periods() {
        let mut hist = RawHistogram::new();
        hist.insert(164);
        hist.insert(172);
        hist.insert(180);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.entries()[0].count, 3);
        // Representative stays at the first-seen value.
        assert_eq!(hist.entries()[0].period, 164);
    }

    #[test]
    fn insert_caps_cluster_count() {
        let mut hist = RawHistogram::new();
        // Geometric spacing keeps every value outside the merge tolerance.
        let mut period = 16u64;
        for _ in 0..(MAX_CLUSTERS + 20) {
            hist.insert(period);
            period = period * 5 / 4;
        }
        assert_eq!(hist.len(), MAX_CLUSTERS);
    }

    #[test]
    fn normalize_merges_chained_clusters() {
        // 100 and 111 are just outside tolerance of each other at insert
        // time, but the chained walk merges them (111 is within 10% of the
        // run reference once 105 joins).
        let entries = [
            HistEntry {
                period: 100,
                count: 4,
            },
            HistEntry {
                period: 106,
                count: 2,
            },
            HistEntry {
                period: 111,
                count: 2,
            },
            HistEntry {
                period: 516,
                count: 7,
            },
        ];
        let merged = collapse_runs(&entries);
        assert_eq!(merged.len(), 2);
        // (100*4 + 106*2 + 111*2) / 8 = 104
        assert_eq!(
            merged[0],
            HistEntry {
                period: 104,
                count: 8,
            }
        );
        assert_eq!(
            merged[1],
            HistEntry {
                period: 516,
                count: 7,
            }
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let entries = [
            HistEntry {
                period: 168,
                count: 30,
            },
            HistEntry {
                period: 172,
                count: 3,
            },
            HistEntry {
                period: 516,
                count: 16,
            },
        ];
        let once = collapse_runs(&entries);
        let twice = collapse_runs(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_empty_input() {
        let hist = RawHistogram::new();
        assert!(hist.normalize().is_empty());
    }

    #[test]
    fn count_for_and_bump() {
        let mut hist = RawHistogram::new();
        for _ in 0..5 {
            hist.insert(172);
        }
        let mut normalized = hist.normalize();
        assert_eq!(normalized.count_for(170), 5);
        assert_eq!(normalized.count_for(516), 0);
        normalized.bump_count(170);
        assert_eq!(normalized.count_for(172), 6);
        // Bumping an unknown period is a no-op.
        normalized.bump_count(516);
        assert_eq!(normalized.total_count(), 6);
    }

    #[test]
    fn scaling_round_trip() {
        assert_eq!(to_scaled(21), 172);
        assert!((scaled_to_unit(172) - 21.5).abs() < f64::EPSILON);
    }
}
