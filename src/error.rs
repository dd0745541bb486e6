use std::fmt;
use std::io;

use thiserror::Error;

/// Which state-machine rule a structural error broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    /// `#NOTEDATA:;` while a NOTEDATA scope is already open.
    NestedNoteData,
    /// `#NOTES:` while note entry is already active.
    NestedNotes,
    /// `;` outside of a `#NOTES:` block.
    StrayTerminator,
    /// A sixth colon-terminated property line inside `#NOTES:`.
    TooManyProperties,
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NestedNoteData => "NOTEDATA while in previous NOTEDATA",
            Self::NestedNotes => "NOTES while in previous NOTES",
            Self::StrayTerminator => "semicolon while not in NOTES",
            Self::TooManyProperties => "over 5 NOTES colon props",
        })
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {kind}: {text:?}")]
    Structural {
        line: usize,
        kind: StructuralKind,
        text: String,
    },

    #[error("line {line}: malformed line, should start with # and end with ;: {text:?}")]
    Format { line: usize, text: String },

    #[error("line {line}: non-numeric {key} component {text:?}")]
    InvalidNumber {
        line: usize,
        key: &'static str,
        text: String,
    },

    #[error("input ended inside an open chart block (opened at line {line})")]
    Unterminated { line: usize },

    #[error("unsupported file extension {0:?} (must be .sm or .ssc)")]
    UnsupportedExtension(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// The input line the error points at, if it has one.
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Structural { line, .. }
            | Self::Format { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::Unterminated { line } => Some(*line),
            Self::UnsupportedExtension(_) | Self::Io(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ParseError>;
