//! Analysis engine for IR remote-control code databases.
//!
//! This crate turns raw mark/space timing captures into identified,
//! normalized protocol data:
//! - Histogram clustering: a noisy timing stream becomes a statistical
//!   fingerprint ([`histogram`], [`fingerprint`])
//! - Protocol matching: fingerprints are compared fuzzily against an ordered
//!   catalog of reference templates ([`catalog`], [`matcher`])
//! - Stream adjustment: matched codes have their periods snapped onto
//!   canonical values, with the final inter-code gap derived rather than
//!   measured ([`adjust`])
//! - Batch orchestration over whole code sets, with per-protocol statistics
//!   ([`analyze`])
//!
//! The import/export collaborator (`irdb-db`) builds and serializes the
//! [`code::CodeSet`] graph; this crate never creates codes, only annotates
//! and corrects them.

pub mod adjust;
pub mod analyze;
pub mod catalog;
pub mod code;
pub mod fingerprint;
pub mod histogram;
pub mod matcher;
pub mod stream;

pub use adjust::adjust_code;
pub use analyze::{analyze_code_sets, render_code};
pub use catalog::{CatalogError, ProtocolCatalog, Provenance, ReferenceProtocol};
pub use code::{Code, CodeSet, DeviceType, RepeatType};
pub use fingerprint::{Encoding, ExtractError, Fingerprint, MarkSpace};
pub use histogram::{Histogram, RawHistogram, durations_match, fuzzy_match};
pub use matcher::MatchStats;
pub use stream::{StreamData, StreamPair, TimingStream};
