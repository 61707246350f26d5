//! The reference protocol catalog.
//!
//! A catalog is an explicitly ordered list of known-protocol templates plus
//! the canonical repeat streams some protocols (NEC, notably) always use.
//! Order is significant: the matcher returns the first compatible template,
//! so more specific, better-trusted entries must precede generic or inferred
//! ones of the same shape. Validation enforces that ordering at load time.
//!
//! The builtin catalog ships as an embedded JSON resource; an external file
//! in the same format can replace it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::{Encoding, MarkSpace};
use crate::stream::TimingStream;

/// Most reference symbol counts or histogram periods a template may declare.
pub const MAX_REFERENCE_ENTRIES: usize = 4;

/// Errors from loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file is not valid JSON for the expected schema.
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// A template declares no valid symbol count.
    #[error("protocol {name:?} declares no symbol counts")]
    NoSymbolCounts { name: String },

    /// A template declares more reference values than the matcher consults.
    #[error("protocol {name:?} declares more than {MAX_REFERENCE_ENTRIES} {field} entries")]
    TooManyReferenceEntries { name: String, field: &'static str },

    /// Reference periods and carriers must be nonzero.
    #[error("protocol {name:?} has a zero {field}")]
    ZeroReferenceValue { name: String, field: &'static str },

    /// A template names a canonical repeat stream the catalog does not hold.
    #[error("protocol {name:?} references unknown repeat stream {id:?}")]
    UnknownRepeatStream { name: String, id: String },

    /// Catalog order must run from most to least trusted.
    #[error("protocol {name:?} at position {position} breaks the provenance ordering")]
    ProvenanceOrder { name: String, position: usize },
}

/// How a template's timings were obtained, in increasing order of trust.
///
/// The adjuster only rewrites codes against `Measured` or `FromSpec`
/// templates; database inferences identify but never correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Inferred by hand from analysis of the database itself.
    FromDatabase,
    /// Measured from real captures.
    Measured,
    /// Taken from the protocol's published specification.
    FromSpec,
}

impl Provenance {
    /// Whether templates of this tier are trusted enough to rewrite timings.
    pub const fn allows_adjustment(self) -> bool {
        matches!(self, Self::FromSpec | Self::Measured)
    }
}

/// One known-protocol template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceProtocol {
    /// Display name, e.g. `"NEC"`.
    pub name: String,
    /// Trust tier; also gates adjustment.
    pub provenance: Provenance,
    /// Encoding class the template expects.
    pub encoding: Encoding,
    /// Valid symbol counts (1 to 4 of them).
    pub symbol_counts: Vec<u64>,
    /// Nominal carrier frequency in Hz.
    pub carrier_freq: u64,
    /// Nominal leading pair; zero means "not a fixed preamble, treat as
    /// data".
    #[serde(default)]
    pub leading: MarkSpace,
    /// Nominal total duration of one transmission.
    pub duration: u64,
    /// Reference mark periods (1 to 4 of them).
    pub mark: Vec<u64>,
    /// Reference space periods (1 to 4 of them).
    pub space: Vec<u64>,
    /// Canonical repeat-stream id for protocols whose repeat never varies.
    #[serde(default)]
    pub repeat_stream: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    protocols: Vec<ReferenceProtocol>,
    #[serde(default)]
    repeat_streams: HashMap<String, Vec<u64>>,
}

/// The ordered protocol table plus shared canonical repeat streams.
#[derive(Debug, Clone)]
pub struct ProtocolCatalog {
    protocols: Vec<ReferenceProtocol>,
    repeat_streams: HashMap<String, Arc<TimingStream>>,
}

impl ProtocolCatalog {
    /// Loads the embedded builtin catalog.
    pub fn builtin() -> Self {
        Self::from_json(include_str!("../resources/protocols.json"))
            .expect("embedded protocol catalog is valid")
    }

    /// Parses and validates a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let catalog = Self {
            protocols: file.protocols,
            repeat_streams: file
                .repeat_streams
                .into_iter()
                .map(|(id, periods)| (id, Arc::new(TimingStream::new(periods))))
                .collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut tier = Provenance::FromSpec;
        for (position, protocol) in self.protocols.iter().enumerate() {
            let name = || protocol.name.clone();

            if protocol.provenance > tier {
                return Err(CatalogError::ProvenanceOrder {
                    name: name(),
                    position,
                });
            }
            tier = protocol.provenance;

            if protocol.symbol_counts.is_empty() {
                return Err(CatalogError::NoSymbolCounts { name: name() });
            }
            for (field, values) in [
                ("symbol_counts", &protocol.symbol_counts),
                ("mark", &protocol.mark),
                ("space", &protocol.space),
            ] {
                if values.len() > MAX_REFERENCE_ENTRIES {
                    return Err(CatalogError::TooManyReferenceEntries {
                        name: name(),
                        field,
                    });
                }
                if values.contains(&0) {
                    return Err(CatalogError::ZeroReferenceValue {
                        name: name(),
                        field,
                    });
                }
            }
            if protocol.carrier_freq == 0 {
                return Err(CatalogError::ZeroReferenceValue {
                    name: name(),
                    field: "carrier_freq",
                });
            }
            if let Some(id) = &protocol.repeat_stream {
                if !self.repeat_streams.contains_key(id) {
                    return Err(CatalogError::UnknownRepeatStream {
                        name: name(),
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The templates, in priority order.
    pub fn protocols(&self) -> &[ReferenceProtocol] {
        &self.protocols
    }

    /// Template at `index`.
    pub fn get(&self, index: usize) -> Option<&ReferenceProtocol> {
        self.protocols.get(index)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    /// True when the catalog holds no templates.
    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    /// Shared handle to a canonical repeat stream.
    pub fn repeat_stream(&self, id: &str) -> Option<Arc<TimingStream>> {
        self.repeat_streams.get(id).map(Arc::clone)
    }
}
