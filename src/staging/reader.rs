//! Chunked delimited-file reading
//!
//! Rows are read in fixed-size chunks to bound memory. Malformed rows
//! (undecodable text, more fields than the header) are counted and skipped.

use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use super::StageError;

/// Column name → position, built from the trimmed header row
#[derive(Debug, Clone)]
pub struct Header {
    positions: HashMap<String, usize>,
    width: usize,
}

impl Header {
    fn from_record(record: &StringRecord) -> Self {
        let positions = record
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self {
            positions,
            width: record.len(),
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Required columns absent from this header, in the order given
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.contains(c))
            .map(|c| c.to_string())
            .collect()
    }
}

/// One data row, addressed by column name
pub struct Row<'a> {
    header: &'a Header,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    /// Cell text; missing columns and empty cells are `None`
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = *self.header.positions.get(column)?;
        self.record.get(idx).filter(|cell| !cell.trim().is_empty())
    }
}

/// A chunk of rows plus the number of malformed rows skipped while reading it
#[derive(Debug, Default)]
pub struct Chunk {
    pub rows: Vec<StringRecord>,
    pub malformed: usize,
}

/// Streaming reader yielding chunks of at most `chunk_size` rows
pub struct ChunkedReader {
    reader: csv::Reader<File>,
    header: Header,
    chunk_size: usize,
    finished: bool,
}

impl ChunkedReader {
    pub fn open(path: &Path, delimiter: u8, chunk_size: usize) -> Result<Self, StageError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_path(path)?;
        let header = Header::from_record(reader.headers()?);

        Ok(Self {
            reader,
            header,
            chunk_size: chunk_size.max(1),
            finished: false,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn row<'a>(&'a self, record: &'a StringRecord) -> Row<'a> {
        Row {
            header: &self.header,
            record,
        }
    }

    /// Read the next chunk; `None` once the input is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, StageError> {
        if self.finished {
            return Ok(None);
        }

        let mut chunk = Chunk::default();
        let mut record = StringRecord::new();
        while chunk.rows.len() < self.chunk_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    if record.len() > self.header.width {
                        chunk.malformed += 1;
                        continue;
                    }
                    chunk.rows.push(record.clone());
                }
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(_) => chunk.malformed += 1,
            }
        }

        if chunk.rows.is_empty() && chunk.malformed == 0 {
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}
