use std::cmp::Ordering;

/// Event beats snap to this grid when they drift just past a grid line.
pub const BEAT_QUANTUM: f64 = 1.0 / 128.0;

/// Beats per measure, regardless of how many rows the measure holds.
pub const MEASURE_BEATS: f64 = 4.0;

const QUANTIZE_SLACK: f64 = 0.00001;
const QUANTIZE_TOLERANCE: f64 = 0.1;

/// One `beat=value` pair from a `#BPMS`/`#STOPS` directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingEntry {
    pub beat: f64,
    pub value: f64,
}

/// A `#BPMS`/`#STOPS` value split into entries.
///
/// Components that fail to parse become NaN and are also listed in
/// `invalid` so the caller can decide whether to keep them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingList {
    pub entries: Vec<TimingEntry>,
    pub invalid: Vec<String>,
}

fn parse_component(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

pub fn parse_timing_list(value: &str) -> TimingList {
    let mut out = TimingList::default();
    for chunk in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (beat_raw, value_raw) = chunk.split_once('=').unwrap_or((chunk, ""));
        let beat = parse_component(beat_raw);
        let val = parse_component(value_raw);
        if beat.is_none() || val.is_none() {
            out.invalid.push(chunk.to_string());
        }
        out.entries.push(TimingEntry {
            beat: beat.unwrap_or(f64::NAN),
            value: val.unwrap_or(f64::NAN),
        });
    }
    out
}

/// Snaps `t` down onto the 1/128 grid when it sits within a tenth of a
/// quantum above a grid line; otherwise returns it unchanged.
#[must_use]
pub fn quantize_beat(t: f64) -> f64 {
    if t % BEAT_QUANTUM == 0.0 {
        return t;
    }
    let whole = t.floor();
    let quanta = (t - whole + QUANTIZE_SLACK) / BEAT_QUANTUM;
    if quanta - quanta.floor() < QUANTIZE_TOLERANCE {
        quanta.floor().mul_add(BEAT_QUANTUM, whole)
    } else {
        t
    }
}

/// Pending timing entries for one chart, consumed front to back.
///
/// Entries are never removed; a cursor marks how far the timeline has
/// consumed them, so `consumed()` stays available for inspection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingQueue {
    entries: Vec<TimingEntry>,
    cursor: usize,
}

impl TimingQueue {
    /// Entries are stably ordered by beat. NaN beats sort last and are
    /// never due.
    pub fn new(mut entries: Vec<TimingEntry>) -> Self {
        entries.sort_by(|a, b| match (a.beat.is_nan(), b.beat.is_nan()) {
            (false, false) => a.beat.partial_cmp(&b.beat).unwrap_or(Ordering::Equal),
            (a_nan, b_nan) => a_nan.cmp(&b_nan),
        });
        Self { entries, cursor: 0 }
    }

    pub fn pending(&self) -> Option<&TimingEntry> {
        self.entries.get(self.cursor)
    }

    /// Takes the pending entry if its beat is at or before `t`.
    pub fn pop_due(&mut self, t: f64) -> Option<TimingEntry> {
        let entry = *self.pending()?;
        if entry.beat <= t {
            self.cursor += 1;
            Some(entry)
        } else {
            None
        }
    }

    pub fn consumed(&self) -> &[TimingEntry] {
        &self.entries[..self.cursor]
    }

    pub fn remaining(&self) -> &[TimingEntry] {
        &self.entries[self.cursor..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(beat: f64, value: f64) -> TimingEntry {
        TimingEntry { beat, value }
    }

    #[test]
    fn parses_beat_value_pairs() {
        let list = parse_timing_list("0=100, 20=200,52.5=825.608\r\n");
        assert!(list.invalid.is_empty());
        assert_eq!(
            list.entries,
            vec![entry(0.0, 100.0), entry(20.0, 200.0), entry(52.5, 825.608)]
        );
    }

    #[test]
    fn malformed_components_become_nan() {
        let list = parse_timing_list("0=120,abc,16=x,");
        assert_eq!(list.invalid, vec!["abc".to_string(), "16=x".to_string()]);
        assert_eq!(list.entries.len(), 3);
        assert!(list.entries[1].beat.is_nan() && list.entries[1].value.is_nan());
        assert_eq!(list.entries[2].beat, 16.0);
        assert!(list.entries[2].value.is_nan());
    }

    #[test]
    fn empty_value_yields_no_entries() {
        assert_eq!(parse_timing_list(""), TimingList::default());
    }

    #[test]
    fn quantize_snaps_only_near_grid_lines() {
        assert_eq!(quantize_beat(0.5), 0.5);
        assert_eq!(quantize_beat(0.25 + 1e-12), 0.25);
        assert_eq!(quantize_beat(0.999_999_999_9), 1.0);
        let third = 4.0 / 3.0;
        assert_eq!(quantize_beat(third), third);
    }

    #[test]
    fn queue_drains_in_beat_order_and_keeps_history() {
        let mut q = TimingQueue::new(vec![entry(8.0, 150.0), entry(0.0, 120.0), entry(8.0, 160.0)]);
        assert_eq!(q.pop_due(-1.0), None);
        assert_eq!(q.pop_due(0.0), Some(entry(0.0, 120.0)));
        assert_eq!(q.pop_due(7.99), None);
        assert_eq!(q.pop_due(8.0), Some(entry(8.0, 150.0)));
        assert_eq!(q.pop_due(8.0), Some(entry(8.0, 160.0)));
        assert_eq!(q.pop_due(100.0), None);
        assert_eq!(q.consumed().len(), 3);
        assert!(q.remaining().is_empty());
    }

    #[test]
    fn nan_beats_are_never_due() {
        let mut q = TimingQueue::new(vec![entry(f64::NAN, 1.0), entry(4.0, 2.0)]);
        assert_eq!(q.pop_due(4.0), Some(entry(4.0, 2.0)));
        assert_eq!(q.pop_due(f64::MAX), None);
        assert_eq!(q.remaining().len(), 1);
    }
}
