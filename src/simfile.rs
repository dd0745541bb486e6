use std::borrow::Cow;
use std::fs;
use std::path::Path;

use crate::error::{ParseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimfileFormat {
    Sm,
    Ssc,
}

impl SimfileFormat {
    /// Matches `sm`/`ssc` case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("sm") {
            Some(Self::Sm)
        } else if ext.eq_ignore_ascii_case("ssc") {
            Some(Self::Ssc)
        } else {
            None
        }
    }
}

/// A simfile loaded from disk.
#[derive(Debug, Clone)]
pub struct OpenedSimfile {
    pub data: Vec<u8>,
}

impl OpenedSimfile {
    pub fn text(&self) -> Cow<'_, str> {
        decode_bytes(&self.data)
    }
}

pub fn format_of(path: &Path) -> Result<SimfileFormat> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    SimfileFormat::from_extension(ext)
        .ok_or_else(|| ParseError::UnsupportedExtension(ext.to_string()))
}

/// Reads a `.sm` or `.ssc` simfile from `path`.
pub fn open(path: impl AsRef<Path>) -> Result<OpenedSimfile> {
    let path = path.as_ref();
    format_of(path)?;
    let data = fs::read(path)?;
    Ok(OpenedSimfile { data })
}

const CP1252_MAP: [u16; 32] = [
    0x20AC, 0xFFFD, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0xFFFD, 0x017D, 0xFFFD, 0xFFFD, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014,
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0xFFFD, 0x017E, 0x0178,
];

fn decode_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F => b as char,
            0x80..=0x9F => {
                char::from_u32(u32::from(CP1252_MAP[(b - 0x80) as usize])).unwrap_or('\u{FFFD}')
            }
            _ => char::from(b),
        })
        .collect()
}

/// UTF-8 when valid, otherwise Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> Cow<'_, str> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .unwrap_or_else(|_| Cow::Owned(decode_cp1252(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extensions() {
        assert!(matches!(
            format_of(Path::new("song.dwi")),
            Err(ParseError::UnsupportedExtension(ext)) if ext == "dwi"
        ));
        assert_eq!(format_of(Path::new("a/b/Song.SSC")).ok(), Some(SimfileFormat::Ssc));
    }

    #[test]
    fn falls_back_to_cp1252() {
        assert_eq!(decode_bytes(b"Caf\xe9 \x93x\x94"), "Café \u{201C}x\u{201D}");
        assert!(matches!(decode_bytes("plain".as_bytes()), Cow::Borrowed("plain")));
    }
}
