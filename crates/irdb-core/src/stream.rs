//! Timing streams and their ownership.
//!
//! A stream is one burst of a code: alternating mark/space period durations
//! as captured, unscaled. Streams are immutable once captured; the adjuster
//! either rewrites an owned stream wholesale or replaces it with a shared
//! canonical template from the protocol catalog.

use std::fmt;
use std::sync::Arc;

/// Ordered sequence of period durations for one burst.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingStream {
    periods: Vec<u64>,
}

impl TimingStream {
    /// Wraps captured periods.
    pub const fn new(periods: Vec<u64>) -> Self {
        Self { periods }
    }

    /// The periods, in capture order.
    pub fn periods(&self) -> &[u64] {
        &self.periods
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// True when the stream holds no periods.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Sum of all periods.
    pub fn duration(&self) -> u64 {
        self.periods.iter().sum()
    }

    pub(crate) fn periods_mut(&mut self) -> &mut [u64] {
        &mut self.periods
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.periods.truncate(len);
    }
}

impl fmt::Display for TimingStream {
    /// Renders mark/space pairs joined by `-`, pairs separated by `,`,
    /// followed by the total duration.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = ' ';
        for period in &self.periods {
            write!(f, "{sep}{period}")?;
            sep = if sep == '-' { ',' } else { '-' };
        }
        write!(f, " (total {})", self.duration())
    }
}

/// A stream slot with explicit ownership.
///
/// Measured streams are [`Owned`](StreamData::Owned) and may be rewritten in
/// place. Canonical repeat templates from the catalog are
/// [`Shared`](StreamData::Shared) and must never be mutated or dropped by
/// release logic; a code merely borrows them.
#[derive(Debug, Clone)]
pub enum StreamData {
    /// Measured data owned by the code.
    Owned(TimingStream),
    /// A canonical template borrowed from the protocol catalog.
    Shared(Arc<TimingStream>),
}

impl StreamData {
    /// The underlying stream, whoever owns it.
    pub fn stream(&self) -> &TimingStream {
        match self {
            Self::Owned(stream) => stream,
            Self::Shared(stream) => stream,
        }
    }

    /// True for catalog-owned canonical templates.
    pub const fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

/// The up-to-two variants of a transmission (toggle codes carry an a and a
/// b half; most codes only an a).
#[derive(Debug, Clone, Default)]
pub struct StreamPair {
    pub a: Option<StreamData>,
    pub b: Option<StreamData>,
}

impl StreamPair {
    /// A pair holding just an owned `a` stream.
    pub fn owned(stream: TimingStream) -> Self {
        Self {
            a: Some(StreamData::Owned(stream)),
            b: None,
        }
    }
}
