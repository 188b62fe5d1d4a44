//! Loading recorded snapshot series.
//!
//! A series is either a JSON array of [`Snapshot`]s or JSON Lines (one
//! snapshot per line). Files ending in `.zst` are zstd-compressed.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tracing::debug;

use crate::model::Snapshot;

/// zstd level used when writing compressed series.
const ZSTD_LEVEL: i32 = 3;

/// Error type for loading or saving snapshot series.
#[derive(Debug)]
pub enum LoadError {
    /// I/O error (including zstd stream errors).
    Io(std::io::Error),
    /// Invalid JSON. `line` is set for JSON Lines input (1-based).
    Parse {
        line: Option<usize>,
        source: serde_json::Error,
    },
    /// Input is not UTF-8.
    Encoding(std::str::Utf8Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::Parse {
                line: Some(line),
                source,
            } => write!(f, "parse error on line {}: {}", line, source),
            LoadError::Parse { line: None, source } => write!(f, "parse error: {}", source),
            LoadError::Encoding(e) => write!(f, "invalid UTF-8: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "zst")
}

/// Parses a series from raw (uncompressed) bytes.
pub fn parse_series(data: &[u8]) -> Result<Vec<Snapshot>, LoadError> {
    let text = std::str::from_utf8(data).map_err(LoadError::Encoding)?;
    let trimmed = text.trim_start();

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|source| LoadError::Parse {
            line: None,
            source,
        });
    }

    let mut series = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let snapshot = serde_json::from_str(line).map_err(|source| LoadError::Parse {
            line: Some(i + 1),
            source,
        })?;
        series.push(snapshot);
    }
    Ok(series)
}

/// Loads a series from `path`, decompressing `.zst` files.
pub fn load_series(path: &Path) -> Result<Vec<Snapshot>, LoadError> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;
    let data = if is_compressed(path) {
        zstd::decode_all(&raw[..])?
    } else {
        raw
    };

    let series = parse_series(&data)?;
    debug!(
        path = %path.display(),
        bytes = data.len(),
        snapshots = series.len(),
        "loaded snapshot series"
    );
    Ok(series)
}

/// Writes `series` as JSON Lines, zstd-compressed when `path` ends in `.zst`.
pub fn save_series(path: &Path, series: &[Snapshot]) -> Result<(), LoadError> {
    let mut buf = Vec::new();
    for snapshot in series {
        serde_json::to_writer(&mut buf, snapshot).map_err(|source| LoadError::Parse {
            line: None,
            source,
        })?;
        buf.push(b'\n');
    }

    let data = if is_compressed(path) {
        zstd::encode_all(&buf[..], ZSTD_LEVEL)?
    } else {
        buf
    };

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&data)?;
    out.flush()?;
    Ok(())
}
