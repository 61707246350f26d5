//! Fingerprint extraction: from a raw timing stream to a structural summary.
//!
//! A fingerprint captures everything the protocol matcher needs: the encoding
//! class, an estimated symbol count, the leading/trailing widths, the total
//! duration and the mark/space cluster histograms.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::histogram::{Histogram, RawHistogram, to_scaled};
use crate::stream::TimingStream;

/// Errors produced by fingerprint extraction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The stream is too short to carry a leading pair, a symbol and a gap.
    #[error("timing stream too short: {length} periods (minimum 4)")]
    TooShort { length: usize },

    /// Streams are mark/space pairs; an odd count is a capture defect.
    #[error("timing stream has odd length: {length}")]
    OddLength { length: usize },
}

/// Structural family of a protocol's symbol encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// Could not be determined.
    #[default]
    Unknown,
    /// Space width constant, mark width carries the data. Older protocols,
    /// almost always Sony.
    MarkVaries,
    /// Mark width constant, space width carries the data. Very common.
    SpaceVaries,
    /// Two widths on both sides. The Philips protocols, usually.
    Biphase,
    /// Pulse-position modulation. Unusual, often IR keyboards.
    Ppm,
    /// Pathological capture that could be any one of the four base classes,
    /// e.g. a code that is all zeros or all ones.
    Ambiguous,
    /// Mark-varies with a rare extra symbol width.
    MarkVariesExtended,
    /// Space-varies with a rare extra symbol width.
    SpaceVariesExtended,
    /// Biphase with an invalid long symbol in the middle, e.g. RC-5x.
    BiphaseExtended,
}

impl Encoding {
    /// True for the four base classes an ambiguous fingerprint may stand for.
    pub const fn is_base(self) -> bool {
        matches!(
            self,
            Self::MarkVaries | Self::SpaceVaries | Self::Biphase | Self::Ppm
        )
    }

    /// Whether a fingerprint classified as `self` is compatible with a
    /// reference template declaring `reference`.
    ///
    /// Exact matches always qualify; an ambiguous fingerprint additionally
    /// matches any base-class template, but never an extended one.
    pub fn matches(self, reference: Self) -> bool {
        self == reference || (self == Self::Ambiguous && reference.is_base())
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::MarkVaries => "mark varies",
            Self::SpaceVaries => "space varies",
            Self::Biphase => "biphase",
            Self::Ppm => "PPM",
            Self::Ambiguous => "ambiguous",
            Self::MarkVariesExtended => "mark varies extended",
            Self::SpaceVariesExtended => "space varies extended",
            Self::BiphaseExtended => "biphase extended",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mark/space width pair. Zero means "not distinguishable from a regular
/// data symbol".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSpace {
    #[serde(default)]
    pub mark: u64,
    #[serde(default)]
    pub space: u64,
}

/// Derived statistical and structural summary of one code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    /// Encoding class derived from the cluster counts.
    pub encoding: Encoding,
    /// Estimated number of data symbols.
    pub symbol_count: u64,
    /// Carrier frequency in Hz; measured at import, overwritten with the
    /// template's nominal carrier once a protocol is matched.
    pub carrier_freq: u64,
    /// Leading mark/space pair (the preamble), zero where folded into data.
    pub leading: MarkSpace,
    /// Trailing mark and inter-code gap, mark zero where folded into data.
    pub trailing: MarkSpace,
    /// Sum of every period in the stream.
    pub duration: u64,
    /// Normalized mark-side histogram (scaled periods).
    pub mark: Histogram,
    /// Normalized space-side histogram (scaled periods).
    pub space: Histogram,
    /// Index of the matched catalog template, once identified.
    pub protocol: Option<usize>,
}

impl Fingerprint {
    /// Extracts a fingerprint from one timing stream.
    ///
    /// `carrier_freq` is carried over from the capture; extraction derives
    /// everything else. The stream must be an even number of periods, at
    /// least four: leading mark/space pair, one or more symbol pairs, and a
    /// trailing mark plus inter-code gap.
    pub fn extract(stream: &TimingStream, carrier_freq: u64) -> Result<Self, ExtractError> {
        let periods = stream.periods();
        let length = periods.len();
        if length < 4 {
            return Err(ExtractError::TooShort { length });
        }
        if length % 2 != 0 {
            return Err(ExtractError::OddLength { length });
        }

        // Cluster the interior periods, alternating mark/space. The leading
        // pair and the trailing mark/gap are examined separately below but
        // still count toward the duration.
        let mut mark_raw = RawHistogram::new();
        let mut space_raw = RawHistogram::new();
        for (index, &period) in periods.iter().enumerate().take(length - 2).skip(2) {
            if index % 2 == 0 {
                mark_raw.insert(to_scaled(period));
            } else {
                space_raw.insert(to_scaled(period));
            }
        }

        let mut mark = mark_raw.normalize();
        let mut space = space_raw.normalize();

        // Fold the leading pair and the trailing mark back into the data
        // clusters when they are not distinguishable from regular symbols.
        let leading_mark = fold_period(periods[0], &mut mark);
        let leading_space = fold_period(periods[1], &mut space);
        let trailing_mark = fold_period(periods[length - 2], &mut mark);
        let trailing_space = periods[length - 1];

        let encoding = classify(&mark, &space);
        let symbol_count = estimate_symbol_count(encoding, &mark, &space);

        Ok(Self {
            encoding,
            symbol_count,
            carrier_freq,
            leading: MarkSpace {
                mark: leading_mark,
                space: leading_space,
            },
            trailing: MarkSpace {
                mark: trailing_mark,
                space: trailing_space,
            },
            duration: stream.duration(),
            mark,
            space,
            protocol: None,
        })
    }
}

/// Returns `period` if it stands out from the histogram's clusters, or zero
/// after folding it into the matching cluster.
fn fold_period(period: u64, histogram: &mut Histogram) -> u64 {
    let scaled = to_scaled(period);
    if histogram.count_for(scaled) > 0 {
        histogram.bump_count(scaled);
        0
    } else {
        period
    }
}

/// Derives the encoding class from the mark/space cluster counts.
///
/// Lone-outlier clusters (count 1) are the deciding signal in several arms: a
/// symbol width seen exactly once is treated as a rare "extended" symbol
/// rather than a third regular state.
fn classify(mark: &Histogram, space: &Histogram) -> Encoding {
    match mark.len() {
        1 => match space.len() {
            0 => Encoding::Unknown,
            // Both sides constant width: could be any single-width encoding.
            // Typically a code that is all zeros or all ones.
            1 => Encoding::Ambiguous,
            2 => Encoding::SpaceVaries,
            3 => {
                // A PPM code could use only 3 symbols with the longest seen
                // once, but PPM is unusual; assume the common case.
                if space.entries()[2].count == 1 {
                    Encoding::SpaceVariesExtended
                } else {
                    Encoding::Ppm
                }
            }
            _ => Encoding::Ppm,
        },
        2 => match space.len() {
            1 => {
                // A single count of the larger mark is ambiguous: the RC-5
                // '0' digit, for example.
                if mark.entries()[1].count == 1 {
                    Encoding::Ambiguous
                } else {
                    Encoding::MarkVaries
                }
            }
            2 => Encoding::Biphase,
            3 => {
                if space.entries()[2].count == 1 {
                    Encoding::BiphaseExtended
                } else {
                    Encoding::Unknown
                }
            }
            _ => Encoding::Unknown,
        },
        3 => {
            if mark.entries()[2].count == 1 {
                Encoding::BiphaseExtended
            } else {
                Encoding::Unknown
            }
        }
        _ => Encoding::Unknown,
    }
}

/// Estimates the number of data symbols for a classified stream.
fn estimate_symbol_count(encoding: Encoding, mark: &Histogram, space: &Histogram) -> u64 {
    let cluster_count = |histogram: &Histogram, index: usize| {
        histogram.get(index).map_or(0, |entry| entry.count)
    };
    match encoding {
        Encoding::MarkVaries | Encoding::MarkVariesExtended => mark.total_count(),
        // Summing the varying side works for the ambiguous cases of
        // space-varies and PPM, and for biphase only when all ones or zeros.
        Encoding::Ambiguous
        | Encoding::SpaceVaries
        | Encoding::SpaceVariesExtended
        | Encoding::Ppm => space.total_count(),
        Encoding::Biphase | Encoding::BiphaseExtended => {
            // Each long period is two half-symbols, each short one is one.
            (cluster_count(mark, 0)
                + 2 * cluster_count(mark, 1)
                + cluster_count(space, 0)
                + 2 * cluster_count(space, 1))
                / 2
        }
        Encoding::Unknown => 0,
    }
}
