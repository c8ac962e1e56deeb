//! Locating the last frame of a numbered file sequence.
//!
//! Frames are named `<prefix><digits>.<ext>`, e.g. `energy0042.png`. The
//! locator lists matching files in a directory, orders them and reports the
//! number of the frame at a given rank from the end.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use regex::Regex;

/// Sentinel returned by [`find_seq`] when no frame is found.
pub const NOT_FOUND: i64 = -1;

/// Ordering applied to matching frames before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort by file name. Only correct when the digits are zero-padded to a
    /// fixed width: `energy10.png` sorts before `energy2.png`.
    #[default]
    Lexicographic,
    /// Sort by the parsed frame number, ties broken by file name.
    Numeric,
}

/// A file that matched the sequence pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub file_name: String,
    pub number: u64,
}

/// Pattern matching `<prefix><digits>.<ext>` exactly, with `prefix` and
/// `ext` taken literally.
pub fn sequence_pattern(prefix: &str, extension: &str) -> Regex {
    let pattern = format!(r"^{}([0-9]+)\.{}$", regex::escape(prefix), regex::escape(extension));
    // Both parts are escaped, so the pattern is always valid.
    Regex::new(&pattern).unwrap()
}

/// List the frames in `directory`, sorted by `order`.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_sequence(
    directory: &Path,
    prefix: &str,
    extension: &str,
    order: SortOrder,
) -> Vec<SequenceEntry> {
    let pattern = sequence_pattern(prefix, extension);

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {}", directory.display(), e);
            return Vec::new();
        }
    };

    let mut frames: Vec<SequenceEntry> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_str()?.to_string();
            let digits = pattern.captures(&file_name)?.get(1)?.as_str().to_string();
            match digits.parse::<u64>() {
                Ok(number) => Some(SequenceEntry { file_name, number }),
                Err(_) => {
                    warn!("Skipping {}: frame number out of range", file_name);
                    None
                }
            }
        })
        .collect();

    match order {
        SortOrder::Lexicographic => frames.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        SortOrder::Numeric => frames.sort_by(|a, b| {
            a.number
                .cmp(&b.number)
                .then_with(|| a.file_name.cmp(&b.file_name))
        }),
    }

    frames
}

/// Frame number at `rank` positions from the end (0 = last).
///
/// Returns `None` when nothing matches or `rank` is out of range.
pub fn locate_seq(
    directory: &Path,
    prefix: &str,
    extension: &str,
    rank: usize,
    order: SortOrder,
) -> Option<u64> {
    let frames = list_sequence(directory, prefix, extension, order);
    let index = frames.len().checked_sub(1)?.checked_sub(rank)?;
    Some(frames[index].number)
}

/// Like [`locate_seq`], but reports "not found" as [`NOT_FOUND`] (`-1`).
pub fn find_seq(
    directory: &Path,
    prefix: &str,
    extension: &str,
    rank: usize,
    order: SortOrder,
) -> i64 {
    locate_seq(directory, prefix, extension, rank, order)
        .and_then(|n| i64::try_from(n).ok())
        .unwrap_or(NOT_FOUND)
}
