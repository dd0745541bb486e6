use std::fmt;
use std::io::BufRead;
use std::mem;

use tracing::{debug, warn};

use crate::chart::{ChartDraft, MAX_NOTES_PROPS, PROP_METER, SongTiming, parse_meter};
use crate::error::{ParseError, Result, StructuralKind};
use crate::line::{Directive, Line, classify};
use crate::song::{Song, format_range};
use crate::timing::{TimingEntry, parse_timing_list};

/// What to do with a `#BPMS`/`#STOPS` component that is not a number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericPolicy {
    /// Fail the parse with [`ParseError::InvalidNumber`].
    #[default]
    Reject,
    /// Keep the component as NaN and record a [`Warning`].
    Keep,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub numeric_policy: NumericPolicy,
}

/// A non-fatal anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A later chart was filed under the same step type and difficulty.
    ChartOverwritten {
        line: usize,
        step_type: String,
        difficulty: String,
    },
    InvalidNumberKept {
        line: usize,
        key: &'static str,
        text: String,
    },
    InvalidMeter { line: usize, text: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChartOverwritten {
                line,
                step_type,
                difficulty,
            } => write!(
                f,
                "line {line}: chart {step_type}/{difficulty} replaces an earlier chart"
            ),
            Self::InvalidNumberKept { line, key, text } => {
                write!(f, "line {line}: non-numeric {key} component {text:?} kept as NaN")
            }
            Self::InvalidMeter { line, text } => {
                write!(f, "line {line}: meter {text:?} is not a number")
            }
        }
    }
}

/// A parsed song and whatever was noticed along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSong {
    pub song: Song,
    pub warnings: Vec<Warning>,
}

/// Where the parser stands relative to chart blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseState {
    #[default]
    Idle,
    /// After `#NOTEDATA:;`, before `#NOTES:`.
    NoteDataOpen,
    /// After `#NOTES:`, until the closing `;`.
    NotesOpen,
}

/// Line-at-a-time simfile parser.
///
/// Each instance owns all of its state, so separate files can be parsed
/// on separate threads with separate parsers. After `feed` returns an
/// error the parse is over and the parser should be dropped.
#[derive(Debug, Default)]
pub struct Parser {
    options: ParseOptions,
    state: ParseState,
    line: usize,
    song: Song,
    timing: SongTiming,
    chart: ChartDraft,
    warnings: Vec<Warning>,
}

impl Parser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub const fn state(&self) -> ParseState {
        self.state
    }

    /// Number of lines fed so far.
    pub const fn line(&self) -> usize {
        self.line
    }

    pub fn feed(&mut self, raw: &str) -> Result<()> {
        self.line += 1;
        match classify(raw, self.state == ParseState::NotesOpen) {
            Line::Skip => Ok(()),
            Line::NoteData => self.open_note_data(raw),
            Line::Notes => self.open_notes(raw),
            Line::MeasureEnd => {
                self.expect_notes(raw)?;
                self.chart.timeline.flush_measure();
                Ok(())
            }
            Line::ChartEnd => {
                self.expect_notes(raw)?;
                self.chart.timeline.flush_measure();
                self.close_chart();
                Ok(())
            }
            Line::Property(prop) => {
                if self.chart.properties.len() >= MAX_NOTES_PROPS {
                    return Err(self.structural(StructuralKind::TooManyProperties, raw));
                }
                self.chart.properties.push(prop.to_string());
                Ok(())
            }
            Line::Row(row) => {
                self.chart.timeline.push_row(row);
                Ok(())
            }
            Line::Directive(d) => self.apply_directive(d),
            Line::Malformed => Err(ParseError::Format {
                line: self.line,
                text: raw.trim().to_string(),
            }),
        }
    }

    /// Ends the parse. Fails if a chart block is still open.
    pub fn finish(self) -> Result<ParsedSong> {
        if self.state != ParseState::Idle {
            return Err(ParseError::Unterminated {
                line: self.chart.opened_at,
            });
        }
        Ok(ParsedSong {
            song: self.song,
            warnings: self.warnings,
        })
    }

    fn structural(&self, kind: StructuralKind, raw: &str) -> ParseError {
        ParseError::Structural {
            line: self.line,
            kind,
            text: raw.trim().to_string(),
        }
    }

    fn expect_notes(&self, raw: &str) -> Result<()> {
        if self.state == ParseState::NotesOpen {
            Ok(())
        } else {
            Err(self.structural(StructuralKind::StrayTerminator, raw))
        }
    }

    fn open_note_data(&mut self, raw: &str) -> Result<()> {
        if self.state != ParseState::Idle {
            return Err(self.structural(StructuralKind::NestedNoteData, raw));
        }
        self.begin_chart();
        self.state = ParseState::NoteDataOpen;
        Ok(())
    }

    fn open_notes(&mut self, raw: &str) -> Result<()> {
        match self.state {
            ParseState::NotesOpen => {
                return Err(self.structural(StructuralKind::NestedNotes, raw));
            }
            ParseState::Idle => self.begin_chart(),
            ParseState::NoteDataOpen => {}
        }
        self.chart.start_notes(&self.timing);
        self.state = ParseState::NotesOpen;
        Ok(())
    }

    /// Directives seen while idle (e.g. an SSC `#STEPSTYPE` placed before
    /// `#NOTEDATA:;`) still belong to the next chart, so they survive here.
    fn begin_chart(&mut self) {
        self.chart.opened_at = self.line;
        debug!(line = self.line, "chart opened");
    }

    fn close_chart(&mut self) {
        let draft = mem::take(&mut self.chart);
        let opened_at = draft.opened_at;
        if let Some(meter) = draft.properties.get(PROP_METER)
            && parse_meter(meter).is_none()
        {
            self.warn(Warning::InvalidMeter {
                line: opened_at,
                text: meter.clone(),
            });
        }

        let done = draft.finish(&self.timing);
        let charts = self.song.charts.entry(done.step_type.clone()).or_default();
        if charts.insert(done.difficulty.clone(), done.chart).is_some() {
            self.warn(Warning::ChartOverwritten {
                line: opened_at,
                step_type: done.step_type,
                difficulty: done.difficulty,
            });
        }
        self.state = ParseState::Idle;
    }

    fn warn(&mut self, warning: Warning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn timing_entries(&mut self, key: &'static str, value: &str) -> Result<Vec<TimingEntry>> {
        let list = parse_timing_list(value);
        for text in list.invalid {
            match self.options.numeric_policy {
                NumericPolicy::Reject => {
                    return Err(ParseError::InvalidNumber {
                        line: self.line,
                        key,
                        text,
                    });
                }
                NumericPolicy::Keep => self.warn(Warning::InvalidNumberKept {
                    line: self.line,
                    key,
                    text,
                }),
            }
        }
        Ok(list.entries)
    }

    fn apply_directive(&mut self, d: Directive<'_>) -> Result<()> {
        let chart_scope = self.state != ParseState::Idle;
        match d.key {
            "TITLE" => self.song.title = d.value.to_string(),
            "ARTIST" => self.song.artist = d.value.to_string(),
            "BPMS" => {
                let entries = self.timing_entries("BPMS", d.value)?;
                if chart_scope {
                    self.chart.bpms = Some(entries);
                } else {
                    self.timing.bpms = entries;
                }
            }
            "STOPS" => {
                let entries = self.timing_entries("STOPS", d.value)?;
                if chart_scope {
                    self.chart.stops = Some(entries);
                } else {
                    self.timing.stops = entries;
                }
            }
            "STEPSTYPE" => self.chart.step_type = d.value.to_string(),
            "DIFFICULTY" => self.chart.difficulty = d.value.to_string(),
            "METER" => match parse_meter(d.value) {
                Some(level) => self.chart.level = level,
                None => self.warn(Warning::InvalidMeter {
                    line: self.line,
                    text: d.value.to_string(),
                }),
            },
            "DISPLAYBPM" => {
                let display = match d.extra.filter(|hi| !hi.is_empty()) {
                    Some(hi) => format_range(d.value, hi),
                    None => d.value.to_string(),
                };
                let display = (!display.is_empty()).then_some(display);
                if chart_scope {
                    self.chart.display_bpm = display;
                } else {
                    self.timing.display_bpm = display;
                }
            }
            key => {
                self.song
                    .other_data
                    .insert(key.to_string(), d.value.to_string());
            }
        }
        Ok(())
    }
}

/// Parses a whole simfile held in memory.
pub fn parse_str(text: &str, options: ParseOptions) -> Result<ParsedSong> {
    let mut parser = Parser::new(options);
    for line in text.lines() {
        parser.feed(line)?;
    }
    parser.finish()
}

/// Parses a simfile from any buffered reader, line by line.
pub fn parse_reader<R: BufRead>(reader: R, options: ParseOptions) -> Result<ParsedSong> {
    let mut parser = Parser::new(options);
    for line in reader.lines() {
        parser.feed(&line?)?;
    }
    parser.finish()
}
