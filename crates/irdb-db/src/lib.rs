//! Textual import/export for IR code databases.
//!
//! The database is line-oriented, pipe-delimited text, one code per line:
//!
//! ```text
//! <codesetId>|<carrierFreq>|<repeatKeyword>|<label>|<firstStream>|<repeatStream>|
//! ```
//!
//! Streams are comma-separated period durations; a `^` separator starts the
//! second (toggle) variant. Labels may themselves contain `|`; the field
//! ends at the first `|` immediately followed by a digit. Lines starting
//! with `#` or `;` are comments.
//!
//! Import is best-effort: a malformed line is logged with its line number
//! and skipped, everything else is kept. Export re-serializes the same
//! schema from the analyzed graph, using each fingerprint's (possibly
//! template-overridden) carrier frequency and the adjusted streams.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use serde::Deserialize;
use thiserror::Error;

use irdb_core::fingerprint::Fingerprint;
use irdb_core::stream::{StreamData, StreamPair, TimingStream};
use irdb_core::{Code, CodeSet, DeviceType, RepeatType};

/// Streams longer than this are truncated at import; trailing periods are
/// dropped with a diagnostic. Real codes are far shorter.
pub const MAX_STREAM_PERIODS: usize = 200;

/// Period values above this draw a warning; almost certainly a typo in the
/// source database.
const HUGE_PERIOD: u64 = 100_000;

/// Fatal import/export errors. Everything per-line is handled in place.
#[derive(Debug, Error)]
pub enum DbError {
    /// Reading or writing the database file failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The codeset mapping resource is not valid JSON.
    #[error("malformed codeset mapping: {0}")]
    MalformedMapping(#[from] serde_json::Error),
}

/// Problems with a single database line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
enum LineError {
    #[error("truncated {field} field")]
    Truncated { field: &'static str },

    #[error("non-digits found in {field} field")]
    InvalidNumber { field: &'static str },

    #[error("invalid characters found in {field} field")]
    InvalidStream { field: &'static str },
}

/// One record of the codeset → device-type/brand table.
#[derive(Debug, Clone, Deserialize)]
pub struct CodesetInfo {
    pub id: u32,
    pub device_type: DeviceType,
    pub brand: String,
}

/// The codeset classification table, loaded once at startup from an embedded
/// or external JSON array of records.
#[derive(Debug, Clone)]
pub struct CodesetMapping {
    entries: HashMap<u32, CodesetInfo>,
}

impl CodesetMapping {
    /// Loads the embedded builtin mapping.
    pub fn builtin() -> Self {
        Self::from_json(include_str!("../resources/codesets.json"))
            .expect("embedded codeset mapping is valid")
    }

    /// Parses a mapping from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        let records: Vec<CodesetInfo> = serde_json::from_str(json)?;
        Ok(Self {
            entries: records.into_iter().map(|info| (info.id, info)).collect(),
        })
    }

    /// An empty mapping; every lookup misses.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Classification for a code set id, if known.
    pub fn lookup(&self, id: u32) -> Option<&CodesetInfo> {
        self.entries.get(&id)
    }
}

/// Reads a database, grouping consecutive lines with the same code set id
/// into one [`CodeSet`].
pub fn import<R: BufRead>(reader: R, mapping: &CodesetMapping) -> Result<Vec<CodeSet>, DbError> {
    let mut sets: Vec<CodeSet> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        match parse_line(trimmed, line_number) {
            Ok(parsed) => append_code(&mut sets, parsed, mapping, line_number),
            Err(error) => {
                tracing::error!(line = line_number, %error, "skipping malformed line");
            }
        }
    }
    Ok(sets)
}

/// Writes the database back out, one CRLF-terminated line per code.
pub fn export<W: Write>(mut writer: W, sets: &[CodeSet]) -> Result<(), DbError> {
    for set in sets {
        for code in &set.codes {
            write!(
                writer,
                "{}|{}|{}|{}",
                set.id,
                code.fingerprint.carrier_freq,
                code.repeat_type.keyword(),
                code.label
            )?;
            write_stream_pair(&mut writer, &code.first)?;
            write_stream_pair(&mut writer, &code.repeat)?;
            write!(writer, "|\r\n")?;
        }
    }
    Ok(())
}

fn write_stream_pair<W: Write>(writer: &mut W, pair: &StreamPair) -> io::Result<()> {
    match &pair.a {
        Some(data) => write_periods(writer, '|', data.stream())?,
        None => write!(writer, "|")?,
    }
    if let Some(data) = &pair.b {
        write_periods(writer, '^', data.stream())?;
    }
    Ok(())
}

fn write_periods<W: Write>(writer: &mut W, prefix: char, stream: &TimingStream) -> io::Result<()> {
    if stream.is_empty() {
        return write!(writer, "{prefix}");
    }
    let mut sep = prefix;
    for &period in stream.periods() {
        write!(writer, "{sep}{period}")?;
        sep = ',';
    }
    Ok(())
}

struct ParsedLine {
    set_id: u32,
    carrier_freq: u64,
    repeat_type: RepeatType,
    label: String,
    first: StreamPair,
    repeat: StreamPair,
}

fn parse_line(line: &str, line_number: usize) -> Result<ParsedLine, LineError> {
    let mut fields = Fields { rest: line };

    let set_id = fields.take_number("code set ID")?;
    let set_id = u32::try_from(set_id).map_err(|_| LineError::InvalidNumber {
        field: "code set ID",
    })?;
    let carrier_freq = fields.take_number("carrier frequency")?;

    let keyword = fields.take_keyword("repeat behavior")?;
    let repeat_type = RepeatType::from_keyword(keyword).unwrap_or_else(|| {
        tracing::error!(line = line_number, keyword, "unknown repeat behavior");
        RepeatType::Unknown
    });

    let label = fields.take_label("button label")?.to_string();
    let first = fields.take_stream("first stream", line_number)?;
    let repeat = fields.take_stream("repeat stream", line_number)?;

    if !fields.rest.trim().is_empty() {
        tracing::error!(
            line = line_number,
            rest = fields.rest,
            "spurious characters at end of line"
        );
    }

    Ok(ParsedLine {
        set_id,
        carrier_freq,
        repeat_type,
        label,
        first,
        repeat,
    })
}

fn append_code(
    sets: &mut Vec<CodeSet>,
    parsed: ParsedLine,
    mapping: &CodesetMapping,
    line_number: usize,
) {
    // Consecutive lines with the same id share a set; an id change starts a
    // new one even if the id was seen before.
    if sets.last().is_none_or(|set| set.id != parsed.set_id) {
        let info = mapping.lookup(parsed.set_id);
        if info.is_none() {
            tracing::warn!(
                line = line_number,
                set = parsed.set_id,
                "code set has no mapping information"
            );
        }
        sets.push(CodeSet {
            id: parsed.set_id,
            device_type: info.map(|info| info.device_type).unwrap_or_default(),
            brand: info.map(|info| info.brand.clone()),
            codes: Vec::new(),
        });
    }

    if let Some(set) = sets.last_mut() {
        set.codes.push(Code {
            set_id: parsed.set_id,
            line_number,
            label: parsed.label,
            repeat_type: parsed.repeat_type,
            first: parsed.first,
            repeat: parsed.repeat,
            fingerprint: Fingerprint {
                carrier_freq: parsed.carrier_freq,
                ..Fingerprint::default()
            },
        });
    }
}

/// Cursor over the remaining fields of one line.
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    /// An unsigned decimal field up to the next `|`. An empty field is zero.
    fn take_number(&mut self, field: &'static str) -> Result<u64, LineError> {
        let end = self
            .rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, tail) = self.rest.split_at(end);
        match tail.chars().next() {
            Some('|') => {}
            None => return Err(LineError::Truncated { field }),
            Some(_) => return Err(LineError::InvalidNumber { field }),
        }

        let number = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| LineError::InvalidNumber { field })?
        };
        self.rest = &tail[1..];
        Ok(number)
    }

    /// A free-text field up to the next `|`.
    fn take_keyword(&mut self, field: &'static str) -> Result<&'a str, LineError> {
        match self.rest.split_once('|') {
            Some((keyword, tail)) => {
                self.rest = tail;
                Ok(keyword)
            }
            None => Err(LineError::Truncated { field }),
        }
    }

    /// The label field, which may itself contain `|`. The terminator is the
    /// first `|` immediately followed by a digit (the start of the first
    /// stream field).
    fn take_label(&mut self, field: &'static str) -> Result<&'a str, LineError> {
        let bytes = self.rest.as_bytes();
        let mut end = 0;
        while end < bytes.len() {
            if bytes[end] == b'|' && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
                let label = &self.rest[..end];
                self.rest = &self.rest[end + 1..];
                return Ok(label);
            }
            end += 1;
        }
        Err(LineError::Truncated { field })
    }

    /// A stream field: comma-separated periods, `^` starting the second
    /// (toggle) variant, terminated by `|`.
    fn take_stream(&mut self, field: &'static str, line_number: usize) -> Result<StreamPair, LineError> {
        let mut first: Vec<u64> = Vec::new();
        let mut second: Vec<u64> = Vec::new();
        let mut into_second = false;
        let mut number = 0u64;
        let mut seen_digits = false;
        let mut end = None;

        for (index, ch) in self.rest.char_indices() {
            match ch {
                '|' | ',' | '^' => {
                    if seen_digits {
                        let periods = if into_second { &mut second } else { &mut first };
                        push_period(periods, number, line_number);
                    }
                    number = 0;
                    seen_digits = false;
                    if ch == '^' {
                        into_second = true;
                    }
                    if ch == '|' {
                        end = Some(index + 1);
                        break;
                    }
                }
                '0'..='9' => {
                    let digit = u64::from(ch.to_digit(10).unwrap_or(0));
                    number = number.saturating_mul(10).saturating_add(digit);
                    seen_digits = true;
                }
                _ => return Err(LineError::InvalidStream { field }),
            }
        }

        let Some(end) = end else {
            return Err(LineError::Truncated { field });
        };
        self.rest = &self.rest[end..];
        Ok(StreamPair {
            a: owned_stream(first),
            b: owned_stream(second),
        })
    }
}

fn push_period(periods: &mut Vec<u64>, value: u64, line_number: usize) {
    if value > HUGE_PERIOD {
        tracing::warn!(line = line_number, value, "huge period in stream field");
    }
    if periods.len() < MAX_STREAM_PERIODS {
        periods.push(value);
    } else {
        tracing::debug!(line = line_number, value, "stream full, period dropped");
    }
}

fn owned_stream(periods: Vec<u64>) -> Option<StreamData> {
    if periods.is_empty() {
        None
    } else {
        Some(StreamData::Owned(TimingStream::new(periods)))
    }
}
