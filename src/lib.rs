//! Converts StepMania `.sm`/`.ssc` simfiles into per-chart event timelines.
//!
//! Each chart becomes a single ordered stream of note rows, BPM changes
//! and stops, every event stamped with its beat `t` and the running
//! combo `c` at that point.

use std::path::Path;

pub mod catalog;
pub mod chart;
pub mod error;
pub mod line;
pub mod parser;
pub mod simfile;
pub mod song;
pub mod timeline;
pub mod timing;

pub use error::{CatalogError, ParseError, StructuralKind};
pub use parser::{NumericPolicy, ParseOptions, ParseState, ParsedSong, Parser, Warning, parse_reader, parse_str};
pub use song::{BpmDisplay, Chart, Event, EventKind, Song, storage_difficulty};

/// Opens, decodes and parses one simfile.
pub fn parse_file(path: impl AsRef<Path>, options: ParseOptions) -> error::Result<ParsedSong> {
    let opened = simfile::open(path)?;
    parse_str(&opened.text(), options)
}
