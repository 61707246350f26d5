//! Stream adjustment: snapping measured periods onto canonical values.
//!
//! Once a code is matched against a trusted template, its raw periods are
//! rewritten: fixed preambles are forced to the nominal constant, data
//! periods snap to the nearest reference cluster, and the final inter-code
//! gap, which cannot be measured independently, is derived from whatever
//! remains of the template's nominal total duration.

use crate::catalog::{ProtocolCatalog, ReferenceProtocol};
use crate::code::Code;
use crate::histogram::fuzzy_match;
use crate::stream::StreamData;

/// Snap tolerance for measured periods, in tenths of a percent (25%).
pub const SNAP_TOLERANCE: u64 = 250;

/// Rewrites a matched code's streams against its template.
///
/// Does nothing unless the fingerprint carries a protocol reference. The
/// caller gates on the template's provenance tier; adjustment itself only
/// cares about the timings. Misses are accumulated across every stream of
/// the code and surfaced as a single warning keyed by source line.
pub fn adjust_code(code: &mut Code, catalog: &ProtocolCatalog) {
    let Some(reference) = code.fingerprint.protocol.and_then(|index| catalog.get(index)) else {
        return;
    };

    let mut missed = 0u32;
    if let Some(data) = code.first.a.as_mut() {
        adjust_stream(data, reference, code.line_number, &mut missed);
    }
    if let Some(data) = code.first.b.as_mut() {
        adjust_stream(data, reference, code.line_number, &mut missed);
    }

    match &reference.repeat_stream {
        Some(id) => {
            // The protocol always repeats with one constant pattern; the
            // measured repeat data is noise. The code now borrows the
            // catalog's canonical stream instead of owning a copy.
            if let Some(canonical) = catalog.repeat_stream(id) {
                code.repeat.a = Some(StreamData::Shared(canonical));
                code.repeat.b = None;
            }
        }
        None => {
            if let Some(data) = code.repeat.a.as_mut() {
                adjust_stream(data, reference, code.line_number, &mut missed);
            }
            if let Some(data) = code.repeat.b.as_mut() {
                adjust_stream(data, reference, code.line_number, &mut missed);
            }
        }
    }

    // The matched protocol's carrier is authoritative over the measured one.
    code.fingerprint.carrier_freq = reference.carrier_freq;

    if missed != 0 {
        tracing::warn!(
            line = code.line_number,
            missed,
            "periods did not normalize"
        );
    }
}

/// Rewrites one stream in place. Shared canonical streams are left alone:
/// they already hold nominal values and are not this code's to mutate.
fn adjust_stream(
    data: &mut StreamData,
    reference: &ReferenceProtocol,
    line_number: usize,
    missed: &mut u32,
) {
    let StreamData::Owned(stream) = data else {
        return;
    };

    if stream.len() % 2 == 1 {
        tracing::error!(
            line = line_number,
            length = stream.len(),
            "internal error: stream length must be even"
        );
        stream.truncate(stream.len() - 1);
    }

    let periods = stream.periods_mut();
    let length = periods.len();
    let mut remaining = as_signed(reference.duration);
    let mut index = 0;

    if length >= 2 {
        if reference.leading.mark != 0 {
            periods[0] = reference.leading.mark;
        } else if !snap_to_reference(&mut periods[0], &reference.mark) {
            tracing::debug!(line = line_number, period = periods[0], "leading mark did not normalize");
            *missed += 1;
        }
        remaining -= as_signed(periods[0]);

        if reference.leading.space != 0 {
            periods[1] = reference.leading.space;
        } else if !snap_to_reference(&mut periods[1], &reference.space) {
            tracing::debug!(line = line_number, period = periods[1], "leading space did not normalize");
            *missed += 1;
        }
        remaining -= as_signed(periods[1]);
        index = 2;
    }

    while index < length {
        if !snap_to_reference(&mut periods[index], &reference.mark) {
            tracing::debug!(line = line_number, period = periods[index], "mark period did not normalize");
            *missed += 1;
        }
        remaining -= as_signed(periods[index]);
        index += 1;

        if index == length - 1 {
            // The final gap absorbs rounding: the total duration is
            // protocol-fixed, so the last period is derived, never matched.
            periods[index] = match u64::try_from(remaining) {
                Ok(value) => value,
                Err(_) => {
                    tracing::error!(
                        line = line_number,
                        remaining,
                        "derived final period is negative"
                    );
                    *missed += 1;
                    0
                }
            };
            index += 1;
        } else {
            if !snap_to_reference(&mut periods[index], &reference.space) {
                tracing::debug!(line = line_number, period = periods[index], "space period did not normalize");
                *missed += 1;
            }
            remaining -= as_signed(periods[index]);
            index += 1;
        }
    }
}

/// Snaps `period` to the nearest reference value within [`SNAP_TOLERANCE`].
/// Returns false (leaving the raw value) when nothing is close enough.
fn snap_to_reference(period: &mut u64, reference: &[u64]) -> bool {
    let nearest = reference
        .iter()
        .filter(|&&value| fuzzy_match(value, *period, SNAP_TOLERANCE))
        .min_by_key(|&&value| value.abs_diff(*period));
    match nearest {
        Some(&value) => {
            *period = value;
            true
        }
        None => false,
    }
}

#[expect(
    clippy::cast_possible_wrap,
    reason = "periods and durations are far below i64::MAX"
)]
const fn as_signed(value: u64) -> i64 {
    value as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::code::{Code, RepeatType};
    use crate::fingerprint::Fingerprint;
    use crate::matcher::MatchStats;
    use crate::stream::{StreamPair, TimingStream};

    fn test_catalog() -> ProtocolCatalog {
        ProtocolCatalog::builtin()
    }

    /// A noisy NEC-shaped capture: 32 alternating bits, slightly off-nominal
    /// widths throughout.
    fn noisy_nec_stream() -> TimingStream {
        let mut periods = vec![339, 173];
        for bit in 0..32u64 {
            periods.push(if bit % 3 == 0 { 20 } else { 22 });
            periods.push(if bit % 2 == 0 { 22 } else { 63 });
        }
        periods.push(21);
        periods.push(1500);
        TimingStream::new(periods)
    }

    fn nec_code(first: TimingStream) -> Code {
        let mut code = Code {
            set_id: 100014,
            line_number: 7,
            label: "POWER".to_string(),
            repeat_type: RepeatType::Full,
            first: StreamPair::owned(first),
            repeat: StreamPair::owned(TimingStream::new(vec![339, 88, 22, 3650])),
            fingerprint: Fingerprint::default(),
        };
        code.fingerprint =
            Fingerprint::extract(code.first.a.as_ref().unwrap().stream(), 38000).unwrap();
        code
    }

    fn identified(mut code: Code, catalog: &ProtocolCatalog) -> Code {
        let mut stats = MatchStats::for_catalog(catalog);
        let (index, _) = catalog.identify(&code.fingerprint, &mut stats).unwrap();
        code.fingerprint.protocol = Some(index);
        code
    }

    #[test]
    fn forces_fixed_leading_pair() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        adjust_code(&mut code, &catalog);

        let periods = code.first.a.as_ref().unwrap().stream().periods().to_vec();
        // The template declares a fixed preamble; the measured 339/173 is
        // overwritten with the exact constants.
        assert_eq!(periods[0], 342);
        assert_eq!(periods[1], 171);
    }

    #[test]
    fn snaps_data_periods_to_reference_clusters() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        adjust_code(&mut code, &catalog);

        let periods = code.first.a.as_ref().unwrap().stream().periods().to_vec();
        for (index, &period) in periods.iter().enumerate().take(periods.len() - 1).skip(2) {
            if index % 2 == 0 {
                assert_eq!(period, 21, "mark at {index}");
            } else {
                assert!(period == 21 || period == 64, "space at {index}: {period}");
            }
        }
    }

    #[test]
    fn derives_final_period_from_remaining_duration() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        adjust_code(&mut code, &catalog);

        let periods = code.first.a.as_ref().unwrap().stream().periods().to_vec();
        let body: u64 = periods[..periods.len() - 1].iter().sum();
        assert_eq!(periods[periods.len() - 1], 4104 - body);
    }

    #[test]
    fn substitutes_canonical_repeat_stream() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        adjust_code(&mut code, &catalog);

        let repeat = code.repeat.a.as_ref().unwrap();
        assert!(repeat.is_shared());
        assert_eq!(repeat.stream().periods(), &[342, 86, 21, 3655]);
        assert!(code.repeat.b.is_none());
    }

    #[test]
    fn readjustment_leaves_canonical_repeat_untouched() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        adjust_code(&mut code, &catalog);
        let before = code.repeat.a.as_ref().unwrap().stream().clone();

        adjust_code(&mut code, &catalog);
        let after = code.repeat.a.as_ref().unwrap();
        assert!(after.is_shared());
        assert_eq!(*after.stream(), before);
        // The catalog's own copy is also intact.
        assert_eq!(
            catalog.repeat_stream("nec").unwrap().periods(),
            &[342, 86, 21, 3655]
        );
    }

    #[test]
    fn overwrites_carrier_with_template_nominal() {
        let catalog = test_catalog();
        let mut code = nec_code(noisy_nec_stream());
        code.fingerprint.carrier_freq = 38400;
        let mut code = identified(code, &catalog);
        adjust_code(&mut code, &catalog);
        assert_eq!(code.fingerprint.carrier_freq, 38000);
    }

    #[test]
    fn counts_misses_without_reverting() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        // Wreck one space so it cannot snap to 21 or 64 within 25%.
        if let Some(StreamData::Owned(stream)) = code.first.a.as_mut() {
            stream.periods_mut()[5] = 40;
        }
        adjust_code(&mut code, &catalog);

        let periods = code.first.a.as_ref().unwrap().stream().periods().to_vec();
        // The stray value stays raw; everything else is still adjusted.
        assert_eq!(periods[5], 40);
        assert_eq!(periods[4], 21);
    }

    #[test]
    fn truncates_odd_length_stream_defensively() {
        let catalog = test_catalog();
        let mut periods = noisy_nec_stream().periods().to_vec();
        periods.push(17);
        let mut code = nec_code(noisy_nec_stream());
        code.first = StreamPair::owned(TimingStream::new(periods));
        let mut code = identified(code, &catalog);
        adjust_code(&mut code, &catalog);

        assert_eq!(code.first.a.as_ref().unwrap().stream().len() % 2, 0);
    }

    #[test]
    fn negative_remainder_is_flagged_not_wrapped() {
        let catalog = test_catalog();
        let mut code = identified(nec_code(noisy_nec_stream()), &catalog);
        // Inflate an interior period far past the nominal duration. It will
        // not snap (miss) and drives the remaining-duration budget negative.
        if let Some(StreamData::Owned(stream)) = code.first.a.as_mut() {
            stream.periods_mut()[3] = 50_000;
        }
        adjust_code(&mut code, &catalog);

        let periods = code.first.a.as_ref().unwrap().stream().periods().to_vec();
        assert_eq!(periods[periods.len() - 1], 0);
    }
}
