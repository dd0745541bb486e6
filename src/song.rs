use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One parsed simfile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub title: String,
    pub artist: String,
    /// Step type (e.g. `dance-single`) to storage difficulty to chart.
    pub charts: BTreeMap<String, BTreeMap<String, Chart>>,
    /// Directives the parser does not interpret, verbatim.
    pub other_data: BTreeMap<String, String>,
}

impl Song {
    pub fn chart(&self, step_type: &str, difficulty: &str) -> Option<&Chart> {
        self.charts.get(step_type)?.get(difficulty)
    }

    pub fn has_step_type(&self, step_type: &str) -> bool {
        self.charts.contains_key(step_type)
    }

    pub fn chart_count(&self) -> usize {
        self.charts.values().map(BTreeMap::len).sum()
    }
}

/// One converted chart.
///
/// `bpm_min`/`bpm_max` are the lowest and highest BPM among `bpms`, not
/// the first and last entries, so a 200, 100, 150 song reports `100–200`
/// where older converters showed `200–150`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub level: f64,
    pub combo: u32,
    pub bpm_display: Option<BpmDisplay>,
    pub bpm_min: Option<f64>,
    pub bpm_max: Option<f64>,
    pub events: Vec<Event>,
    pub bpms: Vec<Event>,
    pub stops: Vec<Event>,
}

/// A point on the chart timeline.
///
/// `t` is the beat and `c` the running combo at the moment the event was
/// emitted. Serialized flat, e.g. `{"t":4.0,"c":3,"n":"1000"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub t: f64,
    pub c: u32,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "b")]
    Bpm(f64),
    #[serde(rename = "s")]
    Stop(f64),
    #[serde(rename = "n")]
    Note(String),
}

impl Event {
    pub const fn bpm(t: f64, c: u32, bpm: f64) -> Self {
        Self { t, c, kind: EventKind::Bpm(bpm) }
    }

    pub const fn stop(t: f64, c: u32, seconds: f64) -> Self {
        Self { t, c, kind: EventKind::Stop(seconds) }
    }

    pub const fn note(t: f64, c: u32, row: String) -> Self {
        Self { t, c, kind: EventKind::Note(row) }
    }

    pub const fn bpm_value(&self) -> Option<f64> {
        match self.kind {
            EventKind::Bpm(b) => Some(b),
            _ => None,
        }
    }

    pub fn row(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Note(n) => Some(n),
            _ => None,
        }
    }
}

/// The BPM shown to players: a single value or a `min–max` range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BpmDisplay {
    Value(f64),
    Text(String),
}

impl fmt::Display for BpmDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Separator for BPM ranges. An en dash, not a hyphen.
pub const RANGE_SEPARATOR: char = '\u{2013}';

pub fn format_range(low: impl fmt::Display, high: impl fmt::Display) -> String {
    format!("{low}{RANGE_SEPARATOR}{high}")
}

/// Maps a raw difficulty name to the key it is filed under.
#[must_use]
pub fn storage_difficulty(raw: &str) -> &str {
    match raw {
        "Easy" => "Basic",
        "Medium" => "Difficult",
        "Hard" => "Expert",
        other => other,
    }
}
