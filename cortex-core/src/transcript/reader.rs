//! Incremental JSONL transcript reader
//!
//! # Error Handling
//!
//! The reader never fails:
//!
//! - **Missing file**: no entries, offset unchanged.
//! - **Malformed JSON lines / non-object values**: logged at debug, skipped.
//! - **File access failure mid-read**: no entries, offset unchanged.
//! - **File truncated** (offset beyond current size): restart from offset 0.
//! - **Incomplete last line**: a trailing line without a newline is only
//!   consumed if it already decodes to a JSON object. Otherwise the offset stops
//!   in front of it so the next run reads it once the writer finishes.
//!
//! # Incremental Reading
//!
//! The cursor is explicit: callers pass the offset to resume from and receive
//! the new end offset in [`ReadBatch`]. Reading stops at the file length
//! observed at open time, so a concurrent appender never causes a partial read
//! past that point.

use super::record::{parse_value, Entry};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Entries read in one pass plus the offset to resume from next time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadBatch {
    pub entries: Vec<Entry>,
    /// Byte offset just past the last consumed line
    pub end_offset: u64,
    /// Lines that were not valid JSON objects
    pub skipped_lines: usize,
}

impl ReadBatch {
    fn unchanged(offset: u64) -> Self {
        Self {
            end_offset: offset,
            ..Default::default()
        }
    }
}

/// Reader bound to one transcript path. Holds no cursor state.
#[derive(Debug, Clone)]
pub struct TranscriptReader {
    path: PathBuf,
}

impl TranscriptReader {
    /// The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every complete line after `offset`.
    pub fn read_from(&self, offset: u64) -> ReadBatch {
        match self.try_read_from(offset) {
            Ok(batch) => batch,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Transcript does not exist yet");
                ReadBatch::unchanged(offset)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    offset,
                    error = %e,
                    "Failed to read transcript, treating as no new entries"
                );
                ReadBatch::unchanged(offset)
            }
        }
    }

    /// Read the whole file from the beginning.
    pub fn read_all(&self) -> ReadBatch {
        self.read_from(0)
    }

    fn try_read_from(&self, offset: u64) -> io::Result<ReadBatch> {
        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();

        let start_offset = if offset > file_size {
            tracing::warn!(
                path = %self.path.display(),
                checkpoint = offset,
                file_size,
                "Transcript truncated, reading from the beginning"
            );
            0
        } else {
            offset
        };

        let mut batch = ReadBatch::unchanged(start_offset);
        if start_offset == file_size {
            return Ok(batch);
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(start_offset))?;
        // Only the bytes present at open time
        let mut reader = reader.take(file_size - start_offset);

        let mut current_offset = start_offset;
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            let terminated = line.last() == Some(&b'\n');
            let record_offset = current_offset;

            match decode_line(&line) {
                LineOutcome::Blank => {}
                LineOutcome::Entry(entry) => batch.entries.push(*entry),
                LineOutcome::Malformed(reason) => {
                    if !terminated {
                        tracing::debug!(
                            offset = record_offset,
                            "Incomplete trailing line, leaving it for the next read"
                        );
                        break;
                    }
                    tracing::debug!(offset = record_offset, reason, "Skipping malformed line");
                    batch.skipped_lines += 1;
                }
            }

            current_offset += read as u64;
        }

        batch.end_offset = current_offset;
        Ok(batch)
    }
}

enum LineOutcome {
    Blank,
    Entry(Box<Entry>),
    Malformed(&'static str),
}

fn decode_line(line: &[u8]) -> LineOutcome {
    let Ok(text) = std::str::from_utf8(line) else {
        return LineOutcome::Malformed("invalid UTF-8");
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => match parse_value(&value) {
            Some(entry) => LineOutcome::Entry(Box::new(entry)),
            None => LineOutcome::Malformed("not a JSON object"),
        },
        Err(_) => LineOutcome::Malformed("invalid JSON"),
    }
}
