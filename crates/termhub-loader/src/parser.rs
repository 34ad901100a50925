//! Generic table parser.
//!
//! Provides a streaming parser for delimited tables with a header row.
//! Columns are located by header name, so extra or reordered columns in
//! the source are tolerated.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::types::{LoadError, LoadResult, TableConfig};

/// Trait for types that can be parsed from table records.
pub trait TableRecord: Sized {
    /// Table name used in diagnostics.
    const TABLE: &'static str;

    /// Columns that must be present in the header.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Parse a record using the header positions in `columns`.
    fn from_record(record: &StringRecord, columns: &ColumnIndex) -> LoadResult<Self>;

    /// Returns true if this record passes the given filter config.
    fn passes_filter(&self, _config: &TableConfig) -> bool {
        true
    }
}

/// Header name to column position.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Builds an index from a header record.
    pub fn from_headers(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            // Handle UTF-8 BOM at start of file
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self { positions }
    }

    /// Returns true if the header contains `column`.
    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Returns the field for `column`, or `""` if the column is absent.
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.positions
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

/// A streaming parser for table files.
pub struct TableParser<R: Read, T: TableRecord> {
    reader: Reader<R>,
    columns: ColumnIndex,
    config: TableConfig,
    records_read: usize,
    _marker: PhantomData<T>,
}

impl<T: TableRecord> TableParser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or lacks a required column.
    pub fn from_path<P: AsRef<Path>>(path: P, config: TableConfig) -> LoadResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read, T: TableRecord> TableParser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R, config: TableConfig) -> LoadResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = ColumnIndex::from_headers(csv_reader.headers()?);
        Self::validate_headers(&columns)?;

        Ok(Self {
            reader: csv_reader,
            columns,
            config,
            records_read: 0,
            _marker: PhantomData,
        })
    }

    fn validate_headers(columns: &ColumnIndex) -> LoadResult<()> {
        match T::REQUIRED_COLUMNS.iter().find(|c| !columns.contains(c)) {
            Some(missing) => Err(LoadError::MissingColumn {
                table: T::TABLE,
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Returns the number of records read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Parses all records into a Vec, applying filters.
    ///
    /// Stops at the first malformed record.
    pub fn parse_all(self) -> LoadResult<Vec<T>> {
        self.collect()
    }
}

impl<R: Read, T: TableRecord> Iterator for TableParser<R, T> {
    type Item = LoadResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.records_read += 1;

                    if record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }

                    match T::from_record(&record, &self.columns) {
                        Ok(parsed) if parsed.passes_filter(&self.config) => return Some(Ok(parsed)),
                        Ok(_) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Helper functions for parsing field values.
///
/// Tables exported from dataframes write integer columns containing gaps
/// as floats (`123.0`) and booleans as `True`/`False`.
pub mod parse {
    use super::{LoadError, LoadResult};

    /// Parses an integer, accepting a zero fractional part.
    pub fn integer(value: &str) -> LoadResult<i64> {
        let trimmed = value.trim();
        let digits = match trimmed.split_once('.') {
            Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
            _ => trimmed,
        };
        digits.parse::<i64>().map_err(|_| LoadError::InvalidInteger {
            value: value.to_string(),
        })
    }

    /// Parses an integer that may be empty.
    pub fn optional_integer(value: &str) -> LoadResult<Option<i64>> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            integer(value).map(Some)
        }
    }

    /// Parses an integer, treating an empty field as zero.
    pub fn count(value: &str) -> LoadResult<i64> {
        optional_integer(value).map(Option::unwrap_or_default)
    }

    /// Parses a boolean; an empty field is false.
    pub fn boolean(value: &str) -> LoadResult<bool> {
        match value.trim() {
            "" | "0" | "False" | "false" | "FALSE" | "0.0" => Ok(false),
            "1" | "True" | "true" | "TRUE" | "1.0" => Ok(true),
            _ => Err(LoadError::InvalidBoolean {
                value: value.to_string(),
            }),
        }
    }

    /// Copies a text field.
    pub fn text(value: &str) -> String {
        value.to_string()
    }
}
