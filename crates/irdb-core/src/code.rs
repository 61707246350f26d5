//! Codes and code sets: the in-memory graph the analysis runs over.
//!
//! The import collaborator builds this graph before analysis begins; the
//! core only mutates fingerprints and may swap a repeat stream for a shared
//! canonical template.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::stream::StreamPair;

/// Declared repeat behavior of a code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepeatType {
    /// Keyword missing or unrecognized.
    #[default]
    Unknown,
    Full,
    Partial,
    Repeat,
    Toggle,
}

impl RepeatType {
    /// Parses the database keyword. Case-sensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Full_Repeat" => Some(Self::Full),
            "Partial_Repeat" => Some(Self::Partial),
            "Repeat" => Some(Self::Repeat),
            "Toggle" => Some(Self::Toggle),
            _ => None,
        }
    }

    /// The database keyword for this repeat behavior.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Full => "Full_Repeat",
            Self::Partial => "Partial_Repeat",
            Self::Repeat => "Repeat",
            Self::Toggle => "Toggle",
        }
    }

    /// Human-readable form for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Full => "full repeat",
            Self::Partial => "partial repeat",
            Self::Repeat => "repeat",
            Self::Toggle => "toggle",
        }
    }
}

impl fmt::Display for RepeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of device a code set drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    #[default]
    Unknown,
    Tv,
    Vcr,
    Dvd,
    Cd,
    Tape,
    Amplifier,
    Tuner,
    SetTopBox,
    Projector,
}

impl DeviceType {
    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown device",
            Self::Tv => "TV",
            Self::Vcr => "VCR",
            Self::Dvd => "DVD player",
            Self::Cd => "CD player",
            Self::Tape => "tape deck",
            Self::Amplifier => "amplifier",
            Self::Tuner => "tuner",
            Self::SetTopBox => "set-top box",
            Self::Projector => "projector",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One button's data.
#[derive(Debug, Clone, Default)]
pub struct Code {
    /// Numeric id of the owning code set (stable back-reference).
    pub set_id: u32,
    /// Line in the source file, for diagnostics.
    pub line_number: usize,
    /// Button label.
    pub label: String,
    /// Declared repeat behavior.
    pub repeat_type: RepeatType,
    /// The "first transmission" streams (a, and b for toggle codes).
    pub first: StreamPair,
    /// The "repeat transmission" streams.
    pub repeat: StreamPair,
    /// Derived summary; recomputed whenever the first stream changes.
    pub fingerprint: Fingerprint,
}

/// A group of codes sharing a device-type/brand classification.
#[derive(Debug, Clone, Default)]
pub struct CodeSet {
    /// Numeric code set id from the database.
    pub id: u32,
    pub device_type: DeviceType,
    /// Brand name, where the mapping table knows the set.
    pub brand: Option<String>,
    /// Codes in insertion order.
    pub codes: Vec<Code>,
}

impl CodeSet {
    /// `"<id> (<brand> <device>)"`, for log lines.
    pub fn describe(&self) -> String {
        format!(
            "{} ({} {})",
            self.id,
            self.brand.as_deref().unwrap_or("unknown brand"),
            self.device_type
        )
    }
}
