//! Module defining the parsing logic used to convert header-first CSV files into typed records.
//!
//! Rows which cannot be decoded do not abort the file: their raw text is collected next to the
//! successfully decoded records, so the caller can report them.

use std::{fs::File, io::Read, path::Path};

use csv::ByteRecord;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::Error;


/// Outcome of reading one file: the decoded records and the raw lines that failed decoding,
/// both in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReadResult<T> {
    pub records: Vec<T>,
    pub unprocessable: Vec<String>,
}

impl<T> Default for FileReadResult<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            unprocessable: Vec::new(),
        }
    }
}

impl<T> FileReadResult<T> {
    /// Number of input rows seen, decoded or not
    pub fn total(&self) -> usize {
        self.records.len() + self.unprocessable.len()
    }
}

/// Opens the file at `path` and reads it with [`read_records`].
pub fn read_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<FileReadResult<T>, Error> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let result = read_records(file)?;
    info!(
        path = %path.display(),
        records = result.records.len(),
        unprocessable = result.unprocessable.len(),
        "file read"
    );
    Ok(result)
}

/// Reads the CSV data provided by the reader in a single forward pass.
///
/// Columns are bound by header name. A row goes to the unprocessable list if its field count
/// differs from the header or any field does not decode into `T`; it is reported with the exact
/// text it had in the input. Only failures of the reader itself are returned as errors.
pub fn read_records<T: DeserializeOwned>(
    mut reader: impl Read,
) -> Result<FileReadResult<T>, Error> {
    // kept to slice out the original text of rows that fail
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input.as_slice());
    let headers = csv_reader.byte_headers()?.clone();

    let mut result = FileReadResult::default();
    let mut row = ByteRecord::new();
    while csv_reader.read_byte_record(&mut row)? {
        let line = row.position().map(|p| p.line());

        let failure = if row.len() != headers.len() {
            debug!(
                ?line,
                expected = headers.len(),
                found = row.len(),
                "row has the wrong number of fields"
            );
            true
        } else {
            match row.deserialize::<T>(Some(&headers)) {
                Ok(record) => {
                    result.records.push(record);
                    false
                }
                Err(err) => {
                    debug!(?line, error = %err, "row could not be decoded");
                    true
                }
            }
        };

        if failure {
            let start = row.position().map_or(0, |p| p.byte() as usize);
            let end = csv_reader.position().byte() as usize;
            result.unprocessable.push(raw_line(&input, start, end));
        }
    }

    Ok(result)
}

// Text of the row between its start offset and the reader position after it, without the
// line terminators around it
fn raw_line(input: &[u8], start: usize, end: usize) -> String {
    let bytes = input.get(start..end.min(input.len())).unwrap_or_default();
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\r' || c == '\n')
        .to_string()
}
