//! Schema inference from the head of a delimited text object.
//!
//! Inference never scans the whole object. [`infer_from_object`] reads a bounded sample
//! ([`sample`]), detects its dialect ([`dialect`]), classifies every data cell once
//! ([`value`]) and folds the results per column through the type lattice ([`lattice`]).

pub mod dialect;
pub mod lattice;
pub mod sample;
pub mod value;

pub use dialect::{Dialect, sniff};
pub use lattice::TypeEvidence;
pub use sample::{Sample, read_sample};
pub use value::{CellValue, NULL_LIKE};

use crate::error::InferenceError;
use crate::io::ObjectSource;
use crate::naming::{dedupe_identifiers, sanitize_identifier};
use crate::row::normalize_row;
use crate::types::{ColumnType, InferredSchema, ObjectLocator, SchemaField, TableSchema};

/// Default number of sampled lines, header included.
pub const DEFAULT_SAMPLE_LINES: usize = 200;
/// Default size of the first ranged read.
pub const DEFAULT_INITIAL_WINDOW: u64 = 256 * 1024;
/// Default ceiling for the ranged read.
pub const DEFAULT_MAX_WINDOW: u64 = 4 * 1024 * 1024;

/// Inference configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOptions {
    /// Number of lines to sample, header included (default: 200)
    pub sample_lines: usize,
    /// Size in bytes of the first ranged read (default: 256 KiB)
    pub initial_window: u64,
    /// Largest ranged read in bytes (default: 4 MiB)
    pub max_window: u64,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            sample_lines: DEFAULT_SAMPLE_LINES,
            initial_window: DEFAULT_INITIAL_WINDOW,
            max_window: DEFAULT_MAX_WINDOW,
        }
    }
}

impl InferenceOptions {
    /// Create new inference options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of sampled lines
    #[must_use]
    pub fn with_sample_lines(mut self, sample_lines: usize) -> Self {
        self.sample_lines = sample_lines;
        self
    }

    /// Set the size of the first ranged read
    #[must_use]
    pub fn with_initial_window(mut self, bytes: u64) -> Self {
        self.initial_window = bytes;
        self
    }

    /// Set the ceiling of the ranged read
    #[must_use]
    pub fn with_max_window(mut self, bytes: u64) -> Self {
        self.max_window = bytes;
        self
    }
}

/// Sample an object and infer its schema.
///
/// # Errors
///
/// Returns an error if the ranged read fails, the sample is empty, the header is blank or
/// has a blank field, or the sample cannot be tokenized.
pub async fn infer_from_object(
    source: &dyn ObjectSource,
    locator: &ObjectLocator,
    options: &InferenceOptions,
) -> Result<InferredSchema, InferenceError> {
    let sample = read_sample(source, locator, options).await?;
    infer_sample(&sample.text, &locator.uri(), &locator.path, options.sample_lines)
}

/// Infer a schema from already-sampled text.
///
/// `object_name` is used in field descriptions and error messages.
///
/// # Errors
///
/// Same as [`infer_from_object`], minus read failures.
pub fn infer_from_text(
    text: &str,
    object_name: &str,
    sample_lines: usize,
) -> Result<InferredSchema, InferenceError> {
    infer_sample(text, object_name, object_name, sample_lines)
}

fn infer_sample(
    text: &str,
    uri: &str,
    object_name: &str,
    sample_lines: usize,
) -> Result<InferredSchema, InferenceError> {
    let lines: Vec<&str> = text.lines().take(sample_lines).collect();
    let Some(first) = lines.first() else {
        return Err(InferenceError::SampleEmpty {
            uri: uri.to_string(),
        });
    };
    if first.trim().is_empty() {
        return Err(InferenceError::HeaderInvalid {
            uri: uri.to_string(),
            reason: "first line is blank; expected a header".to_string(),
        });
    }

    let sample_text = lines.join("\n");
    let dialect = sniff(&sample_text).unwrap_or_else(|| {
        log::debug!("Could not sniff dialect of {uri}; using comma-delimited defaults");
        Dialect::default()
    });

    let parse_err = |source| InferenceError::Parse {
        uri: uri.to_string(),
        source,
    };
    let mut reader = dialect.reader_builder().from_reader(sample_text.as_bytes());
    let mut records = reader.records();

    let header: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(parse_err)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => {
            return Err(InferenceError::SampleEmpty {
                uri: uri.to_string(),
            });
        },
    };
    if let Some(pos) = header.iter().position(String::is_empty) {
        return Err(InferenceError::HeaderInvalid {
            uri: uri.to_string(),
            reason: format!("field {} is blank", pos + 1),
        });
    }

    let width = header.len();
    let mut evidence: Vec<Option<TypeEvidence>> = vec![None; width];
    let mut sampled_rows = 0usize;

    for record in records {
        let record = record.map_err(parse_err)?;
        let row = normalize_row(record.iter().map(str::to_string).collect(), width);
        for (slot, cell) in evidence.iter_mut().zip(&row) {
            *slot = lattice::accumulate(*slot, CellValue::classify(cell).evidence());
        }
        sampled_rows += 1;
    }

    let columns = dedupe_identifiers(header.iter().map(|h| sanitize_identifier(h)).collect());
    let description = format!("Inferred from {object_name}");
    let fields = columns
        .iter()
        .zip(evidence)
        .map(|(name, ev)| {
            let column_type = ev.map_or(ColumnType::String, TypeEvidence::resolve);
            SchemaField::new(name, column_type, description.clone())
        })
        .collect();

    let schema = TableSchema::new(fields);
    log::info!(
        "Inferred schema for {uri} from {sampled_rows} rows: {}",
        schema.schema_string()
    );

    Ok(InferredSchema {
        schema,
        columns,
        dialect,
        sampled_rows,
    })
}
