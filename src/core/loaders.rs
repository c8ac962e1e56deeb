//! Loader for interleaved N-body position logs.
//!
//! A position log is a headerless, comma-delimited CSV with exactly three
//! numeric columns (x, y, z). Rows are interleaved round-robin across
//! bodies: row `j` belongs to body `j mod n`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Errors that can occur while loading a position log.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path}:{line}: expected 3 columns, found {found}")]
    ColumnCount {
        path: PathBuf,
        line: u64,
        found: usize,
    },

    #[error("{path}:{line}: invalid number {value:?}")]
    ParseError {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path}:{line}: non-finite coordinate {value:?}")]
    NonFinite {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Dense table of positions, one `[x, y, z]` row per (body, time-step) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionLog {
    rows: Vec<[f64; 3]>,
}

impl PositionLog {
    /// Creates a log from already-parsed rows.
    pub fn from_rows(rows: Vec<[f64; 3]>) -> Self {
        Self { rows }
    }

    /// Returns the number of rows in the log.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the log has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at `index`, if present.
    #[inline]
    pub fn row(&self, index: usize) -> Option<[f64; 3]> {
        self.rows.get(index).copied()
    }

    pub fn rows(&self) -> &[[f64; 3]] {
        &self.rows
    }
}

/// Load a position log from a headerless x,y,z CSV file.
///
/// Blank lines and lines starting with `#` are skipped. Every other line
/// must hold exactly three finite numeric fields (`nan` and `inf` are
/// rejected). An empty file yields an empty log.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row is malformed.
pub fn load_position_csv<P: AsRef<Path>>(path: P) -> Result<PositionLog> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoaderError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::with_capacity(4096);

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        if record.len() != 3 {
            return Err(LoaderError::ColumnCount {
                path: path.to_path_buf(),
                line,
                found: record.len(),
            });
        }

        let mut row = [0.0f64; 3];
        for (slot, field) in row.iter_mut().zip(record.iter()) {
            let value: f64 = field.parse().map_err(|_| LoaderError::ParseError {
                path: path.to_path_buf(),
                line,
                value: field.to_string(),
            })?;
            if !value.is_finite() {
                return Err(LoaderError::NonFinite {
                    path: path.to_path_buf(),
                    line,
                    value: field.to_string(),
                });
            }
            *slot = value;
        }
        rows.push(row);
    }

    Ok(PositionLog { rows })
}
