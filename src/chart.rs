use tracing::debug;

use crate::song::{BpmDisplay, Chart, format_range, storage_difficulty};
use crate::timeline::Timeline;
use crate::timing::{TimingEntry, TimingQueue};

/// `#NOTES:` property slots, in order.
pub const PROP_STEP_TYPE: usize = 0;
pub const PROP_DIFFICULTY: usize = 2;
pub const PROP_METER: usize = 3;
/// Step type, description, difficulty, meter, groove radar.
pub const MAX_NOTES_PROPS: usize = 5;

/// Song-level defaults every chart starts from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongTiming {
    pub bpms: Vec<TimingEntry>,
    pub stops: Vec<TimingEntry>,
    pub display_bpm: Option<String>,
}

/// The chart currently being read.
///
/// A fresh draft is made for every chart; nothing carries over from the
/// previous one.
#[derive(Debug, Clone, Default)]
pub struct ChartDraft {
    /// Line of the `#NOTEDATA:;`/`#NOTES:` that opened this chart.
    pub opened_at: usize,
    pub step_type: String,
    pub difficulty: String,
    pub level: f64,
    /// Chart-scope `#BPMS`/`#STOPS`, shadowing the song's.
    pub bpms: Option<Vec<TimingEntry>>,
    pub stops: Option<Vec<TimingEntry>>,
    pub display_bpm: Option<String>,
    pub properties: Vec<String>,
    pub timeline: Timeline,
}

/// A chart ready to be filed into the song.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedChart {
    pub step_type: String,
    /// Difficulty after the storage remap.
    pub difficulty: String,
    pub chart: Chart,
}

impl ChartDraft {
    pub fn new(opened_at: usize) -> Self {
        Self {
            opened_at,
            ..Self::default()
        }
    }

    /// Starts note entry, resolving the timing queues against the song's.
    pub fn start_notes(&mut self, song: &SongTiming) {
        let bpms = self.bpms.clone().unwrap_or_else(|| song.bpms.clone());
        let stops = self.stops.clone().unwrap_or_else(|| song.stops.clone());
        self.timeline = Timeline::new(TimingQueue::new(bpms), TimingQueue::new(stops));
    }

    pub fn finish(self, song: &SongTiming) -> FinishedChart {
        let Self {
            mut step_type,
            mut difficulty,
            mut level,
            display_bpm,
            properties,
            timeline,
            ..
        } = self;

        // SM charts carry their metadata as #NOTES: properties.
        if !properties.is_empty() {
            step_type = properties.get(PROP_STEP_TYPE).cloned().unwrap_or_default();
            difficulty = properties.get(PROP_DIFFICULTY).cloned().unwrap_or_default();
            if let Some(meter) = properties.get(PROP_METER).and_then(|m| parse_meter(m)) {
                level = meter;
            }
        }

        let out = timeline.finish();
        let (bpm_min, bpm_max) = bpm_bounds(out.bpms.iter().filter_map(|e| e.bpm_value()));
        let bpm_display = display_bpm
            .or_else(|| song.display_bpm.clone())
            .map(BpmDisplay::Text)
            .or_else(|| computed_display(bpm_min, bpm_max));

        let difficulty = storage_difficulty(&difficulty).to_string();
        debug!(
            step_type = %step_type,
            difficulty = %difficulty,
            combo = out.combo,
            events = out.events.len(),
            "chart finished"
        );

        FinishedChart {
            step_type,
            difficulty,
            chart: Chart {
                level,
                combo: out.combo,
                bpm_display,
                bpm_min,
                bpm_max,
                events: out.events,
                bpms: out.bpms,
                stops: out.stops,
            },
        }
    }
}

pub fn parse_meter(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn bpm_bounds(values: impl Iterator<Item = f64>) -> (Option<f64>, Option<f64>) {
    values.fold((None, None), |(lo, hi), v| {
        (
            Some(lo.map_or(v, |l: f64| l.min(v))),
            Some(hi.map_or(v, |h: f64| h.max(v))),
        )
    })
}

fn computed_display(min: Option<f64>, max: Option<f64>) -> Option<BpmDisplay> {
    let (min, max) = (min?, max?);
    if min == max {
        Some(BpmDisplay::Value(min))
    } else {
        Some(BpmDisplay::Text(format_range(min, max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(f64, f64)]) -> Vec<TimingEntry> {
        pairs
            .iter()
            .map(|&(beat, value)| TimingEntry { beat, value })
            .collect()
    }

    fn one_measure(draft: &mut ChartDraft, song: &SongTiming) {
        draft.start_notes(song);
        draft.timeline.push_row("1000");
        draft.timeline.push_row("0000");
        draft.timeline.flush_measure();
        draft.timeline.push_row("0001");
        draft.timeline.flush_measure();
    }

    #[test]
    fn sm_properties_override_directives() {
        let song = SongTiming::default();
        let mut draft = ChartDraft::new(1);
        draft.step_type = "dance-double".into();
        draft.difficulty = "Challenge".into();
        draft.properties = ["dance-single", "author", "Medium", "7", "0,0,0,0,0"]
            .map(String::from)
            .to_vec();
        one_measure(&mut draft, &song);
        let done = draft.finish(&song);
        assert_eq!(done.step_type, "dance-single");
        assert_eq!(done.difficulty, "Difficult");
        assert_eq!(done.chart.level, 7.0);
        assert_eq!(done.chart.combo, 2);
    }

    #[test]
    fn chart_scope_timing_shadows_song_scope() {
        let song = SongTiming {
            bpms: entries(&[(0.0, 120.0)]),
            ..SongTiming::default()
        };
        let mut draft = ChartDraft::new(1);
        draft.bpms = Some(entries(&[(0.0, 150.0), (4.0, 75.0)]));
        one_measure(&mut draft, &song);
        let chart = draft.finish(&song).chart;
        assert_eq!(chart.bpm_min, Some(75.0));
        assert_eq!(chart.bpm_max, Some(150.0));
        assert_eq!(chart.bpm_display, Some(BpmDisplay::Text("75\u{2013}150".into())));
    }

    #[test]
    fn display_bpm_precedence() {
        let mut song = SongTiming {
            bpms: entries(&[(0.0, 120.0)]),
            ..SongTiming::default()
        };

        let mut draft = ChartDraft::new(1);
        one_measure(&mut draft, &song);
        assert_eq!(draft.finish(&song).chart.bpm_display, Some(BpmDisplay::Value(120.0)));

        song.display_bpm = Some("100".into());
        let mut draft = ChartDraft::new(1);
        one_measure(&mut draft, &song);
        assert_eq!(draft.finish(&song).chart.bpm_display, Some(BpmDisplay::Text("100".into())));

        let mut draft = ChartDraft::new(1);
        draft.display_bpm = Some("*".into());
        one_measure(&mut draft, &song);
        assert_eq!(draft.finish(&song).chart.bpm_display, Some(BpmDisplay::Text("*".into())));
    }

    #[test]
    fn no_bpms_means_no_bounds() {
        let song = SongTiming::default();
        let mut draft = ChartDraft::new(1);
        one_measure(&mut draft, &song);
        let chart = draft.finish(&song).chart;
        assert_eq!((chart.bpm_min, chart.bpm_max, chart.bpm_display), (None, None, None));
    }
}
