//! Threshold record input
//!
//! Lines are `vm_id,memory_threshold,storage_threshold`. Blank lines and
//! lines whose first field is empty or starts with `#` are skipped without
//! producing an entry. Quotes carry no meaning and fields are checked as
//! raw bytes, so one bad line never affects its neighbours. Surrounding
//! whitespace in a field is ignored.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, Trim};

use crate::error::GuardError;
use crate::models::ThresholdRecord;

const COMMENT_MARKER: u8 = b'#';

/// A non-skipped input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Valid(ThresholdRecord),
    Malformed { line: u64, raw: String },
}

/// Lazy reader over a threshold file
pub struct RecordSource {
    path: PathBuf,
    reader: csv::Reader<File>,
}

impl RecordSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref().to_path_buf();
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_path(&path)
            .map_err(|source| GuardError::Input {
                path: path.clone(),
                source,
            })?;

        Ok(Self { path, reader })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in input order; consumes the source
    pub fn entries(self) -> impl Iterator<Item = Entry> {
        let mut line = 0u64;
        self.reader
            .into_byte_records()
            .filter_map(move |result| {
                line += 1;
                match result {
                    Ok(record) => {
                        let line = record.position().map(|p| p.line()).unwrap_or(line);
                        classify(&record, line)
                    }
                    Err(err) => {
                        let line = err.position().map(|p| p.line()).unwrap_or(line);
                        Some(Entry::Malformed {
                            line,
                            raw: err.to_string(),
                        })
                    }
                }
            })
    }
}

fn classify(record: &ByteRecord, line: u64) -> Option<Entry> {
    let first = record.get(0).unwrap_or(b"");
    if first.is_empty() || first.starts_with(&[COMMENT_MARKER]) {
        return None;
    }

    let malformed = || Entry::Malformed {
        line,
        raw: record
            .iter()
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join(","),
    };

    if record.len() != 3 {
        return Some(malformed());
    }

    match (
        parse_field(&record[0]),
        parse_field(&record[1]),
        parse_field(&record[2]),
    ) {
        (Some(vm_id), Some(memory), Some(storage)) => Some(Entry::Valid(ThresholdRecord {
            vm_id,
            memory_threshold_percent: memory,
            storage_threshold_percent: storage,
        })),
        _ => Some(malformed()),
    }
}

/// One or more ASCII digits that fit in a `u32`
fn parse_field(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}
