//! File-backed song catalog and per-step-type chart artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::CatalogError;
use crate::song::{Chart, Song};

pub const DANCE_SINGLE: &str = "dance-single";
pub const DANCE_DOUBLE: &str = "dance-double";

/// Step types that get a chart artifact written.
pub const ARTIFACT_STEP_TYPES: [&str; 2] = [DANCE_SINGLE, DANCE_DOUBLE];

type CatalogResult<T> = std::result::Result<T, CatalogError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CatalogError + '_ {
    move |source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// One song as stored in the catalog, unique by `(title, artist)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub title: String,
    pub artist: String,
    pub charts: Value,
    pub chart_type_dance_single: bool,
    pub chart_type_dance_double: bool,
    pub other_data: Value,
}

impl CatalogRecord {
    pub fn from_song(song: &Song) -> CatalogResult<Self> {
        Ok(Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            charts: serde_json::to_value(&song.charts)?,
            chart_type_dance_single: song.has_step_type(DANCE_SINGLE),
            chart_type_dance_double: song.has_step_type(DANCE_DOUBLE),
            other_data: serde_json::to_value(&song.other_data)?,
        })
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    songs: Vec<CatalogRecord>,
}

impl Catalog {
    /// Loads a catalog, or starts an empty one if `path` does not exist.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(io_error(path)(e)),
        }
    }

    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json).map_err(io_error(path))
    }

    /// Inserts the song, or replaces the record with the same title and artist.
    pub fn upsert(&mut self, song: &Song) -> CatalogResult<Upsert> {
        let record = CatalogRecord::from_song(song)?;
        match self
            .songs
            .iter_mut()
            .find(|r| r.title == record.title && r.artist == record.artist)
        {
            Some(existing) => {
                *existing = record;
                Ok(Upsert::Updated)
            }
            None => {
                self.songs.push(record);
                Ok(Upsert::Inserted)
            }
        }
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// `"{title} - {artist}"` for every record, in catalog order.
    pub fn song_list(&self) -> Vec<String> {
        self.songs.iter().map(CatalogRecord::display_name).collect()
    }
}

pub fn write_song_list(catalog: &Catalog, path: &Path) -> CatalogResult<()> {
    let json = serde_json::to_vec(&catalog.song_list())?;
    fs::write(path, json).map_err(io_error(path))
}

/// Replaces characters that are illegal in file names on common
/// filesystems with `_`, and trims trailing dots and spaces.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim_end_matches(['.', ' ']).to_string()
}

pub fn artifact_file_name(song: &Song, step_type: &str) -> String {
    sanitize_file_name(&format!("{} - {}--{}.json", song.title, song.artist, step_type))
}

#[derive(Serialize)]
struct ChartArtifact<'a> {
    title: &'a str,
    artist: &'a str,
    charts: &'a BTreeMap<String, Chart>,
}

/// Writes one JSON file per supported step type into `dir` and returns
/// the written paths.
pub fn write_chart_artifacts(song: &Song, dir: &Path) -> CatalogResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (step_type, charts) in &song.charts {
        if !ARTIFACT_STEP_TYPES.contains(&step_type.as_str()) {
            info!("Skipping chart type {step_type}");
            continue;
        }
        let path = dir.join(artifact_file_name(song, step_type));
        let artifact = ChartArtifact {
            title: &song.title,
            artist: &song.artist,
            charts,
        };
        let json = serde_json::to_vec(&artifact)?;
        fs::write(&path, json).map_err(io_error(&path))?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_illegal_characters() {
        assert_eq!(sanitize_file_name("AC/DC: Live?"), "AC_DC_ Live_");
        assert_eq!(sanitize_file_name("Trailing... "), "Trailing");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }

    #[test]
    fn artifact_names_are_deterministic() {
        let song = Song {
            title: "Foo".into(),
            artist: "Bar".into(),
            ..Song::default()
        };
        assert_eq!(artifact_file_name(&song, DANCE_SINGLE), "Foo - Bar--dance-single.json");
    }

    #[test]
    fn upsert_replaces_by_title_and_artist() {
        let mut catalog = Catalog::default();
        let mut song = Song {
            title: "Foo".into(),
            artist: "Bar".into(),
            ..Song::default()
        };
        assert_eq!(catalog.upsert(&song).unwrap(), Upsert::Inserted);
        song.charts.entry(DANCE_DOUBLE.into()).or_default();
        assert_eq!(catalog.upsert(&song).unwrap(), Upsert::Updated);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.records()[0].chart_type_dance_double);
        assert!(!catalog.records()[0].chart_type_dance_single);

        song.artist = "Baz".into();
        assert_eq!(catalog.upsert(&song).unwrap(), Upsert::Inserted);
        assert_eq!(catalog.song_list(), vec!["Foo - Bar", "Foo - Baz"]);
    }
}
