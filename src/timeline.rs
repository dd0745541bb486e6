use std::mem;

use tracing::trace;

use crate::song::Event;
use crate::timing::{MEASURE_BEATS, TimingQueue, quantize_beat};

/// Whether a note row holds any object at all.
#[inline(always)]
pub fn has_object(row: &str) -> bool {
    row.bytes().any(|b| b != b'0')
}

/// Whether a note row holds something that counts toward combo: a step,
/// hold head, roll head or mine. Hold tails alone do not.
#[inline(always)]
pub fn has_step(row: &str) -> bool {
    row.bytes().any(|b| matches!(b, b'1' | b'2' | b'4' | b'M'))
}

/// The events of one finished timeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineEvents {
    pub events: Vec<Event>,
    pub bpms: Vec<Event>,
    pub stops: Vec<Event>,
    pub combo: u32,
}

/// Walks a chart's measures, tracking beat and combo and merging due
/// BPM changes and stops into the event stream.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    t: f64,
    c: u32,
    bpm_queue: TimingQueue,
    stop_queue: TimingQueue,
    rows: Vec<String>,
    out: TimelineEvents,
}

impl Timeline {
    pub fn new(bpm_queue: TimingQueue, stop_queue: TimingQueue) -> Self {
        Self {
            bpm_queue,
            stop_queue,
            ..Self::default()
        }
    }

    pub const fn beat(&self) -> f64 {
        self.t
    }

    pub const fn combo(&self) -> u32 {
        self.c
    }

    pub fn push_row(&mut self, row: &str) {
        self.rows.push(row.to_string());
    }

    /// Emits the buffered measure and advances the cursor by one measure.
    pub fn flush_measure(&mut self) {
        let start = self.t;
        let rows = mem::take(&mut self.rows);
        trace!(beat = start, rows = rows.len(), "flushing measure");

        // Timing due at the measure start lands ahead of its first row.
        self.drain();

        if !rows.is_empty() {
            let per_row = MEASURE_BEATS / rows.len() as f64;
            for row in rows {
                if has_object(&row) {
                    let counts = has_step(&row);
                    self.out.events.push(Event::note(self.t, self.c, row));
                    if counts {
                        self.c += 1;
                    }
                }
                self.t = quantize_beat(self.t + per_row);
                self.drain();
            }
        }

        self.t = start + MEASURE_BEATS;
        self.drain();
    }

    /// Emits every BPM change and stop due at the cursor, merged by beat.
    /// A BPM change goes ahead of a stop at the same beat.
    fn drain(&mut self) {
        loop {
            let bpm_due = self.bpm_queue.pending().filter(|e| e.beat <= self.t);
            let stop_due = self.stop_queue.pending().filter(|e| e.beat <= self.t);
            let take_bpm = match (bpm_due, stop_due) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(b), Some(s)) => b.beat <= s.beat,
            };
            if take_bpm {
                if let Some(entry) = self.bpm_queue.pop_due(self.t) {
                    let ev = Event::bpm(entry.beat, self.c, entry.value);
                    self.out.events.push(ev.clone());
                    self.out.bpms.push(ev);
                }
            } else if let Some(entry) = self.stop_queue.pop_due(self.t) {
                let ev = Event::stop(entry.beat, self.c, entry.value);
                self.out.events.push(ev.clone());
                self.out.stops.push(ev);
            }
        }
    }

    pub fn finish(mut self) -> TimelineEvents {
        self.out.combo = self.c;
        self.out
    }
}
