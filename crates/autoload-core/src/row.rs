//! Row parsing for load jobs.
//!
//! A load job parses every data line of the source object with a [`RowParser`] built from
//! the column list captured when the job was launched. The parser never looks at the header
//! again.

use std::collections::BTreeMap;

use crate::inference::Dialect;

/// One parsed line keyed by column name. Values stay as text; the table store coerces them.
pub type Record = BTreeMap<String, String>;

/// Pad `fields` with empty strings or truncate it so it has exactly `width` entries.
#[must_use]
pub fn normalize_row(mut fields: Vec<String>, width: usize) -> Vec<String> {
    fields.resize(width, String::new());
    fields
}

/// Parses single lines into [`Record`]s.
#[derive(Debug, Clone)]
pub struct RowParser {
    columns: Vec<String>,
    dialect: Dialect,
}

impl RowParser {
    /// Create a parser for a fixed column list.
    #[must_use]
    pub fn new(columns: Vec<String>, dialect: Dialect) -> Self {
        Self { columns, dialect }
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Split one line into exactly `columns().len()` fields, honouring the dialect's quoting.
    ///
    /// # Errors
    ///
    /// Returns the tokenizer error if the line cannot be read.
    pub fn parse_fields(&self, line: &str) -> Result<Vec<String>, csv::Error> {
        let mut reader = self.dialect.reader_builder().from_reader(line.as_bytes());
        let fields = match reader.records().next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        };
        Ok(normalize_row(fields, self.columns.len()))
    }

    /// Parse one line into a name-keyed record.
    ///
    /// # Errors
    ///
    /// Returns the tokenizer error if the line cannot be read.
    pub fn parse_line(&self, line: &str) -> Result<Record, csv::Error> {
        let fields = self.parse_fields(line)?;
        Ok(self.columns.iter().cloned().zip(fields).collect())
    }
}
