//! The load job: stream one object into its destination table.
//!
//! This is what a submitted [`LoadJobSpec`] describes. It re-reads the whole object line by
//! line, maps every data line onto the column list captured at launch time and appends the
//! records in batches. The header is skipped by position, never parsed.

use std::io;

use autoload_core::error::LoadError;
use autoload_core::io::{ObjectSource, TableStore};
use autoload_core::row::{Record, RowParser};
use futures::TryStreamExt;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::launch::LoadJobSpec;

/// Default number of records per append call.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Summary of a finished load job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Name of the job.
    pub job_name: String,
    /// Lines read from the object, header included.
    pub lines_read: usize,
    /// Blank lines that were skipped.
    pub blank_lines: usize,
    /// Rows the table store accepted.
    pub rows_appended: usize,
}

/// Run a load job to completion.
///
/// # Errors
///
/// Returns [`LoadError`] if the spec has no columns, the object cannot be opened or read,
/// a line cannot be tokenized, or the table store rejects a batch.
pub async fn run_load_job(
    spec: &LoadJobSpec,
    objects: &dyn ObjectSource,
    tables: &dyn TableStore,
    batch_size: usize,
) -> Result<LoadReport, LoadError> {
    if spec.columns.is_empty() {
        return Err(LoadError::NoColumns {
            job_name: spec.job_name.clone(),
        });
    }
    let uri = spec.input_uri();
    let batch_size = batch_size.max(1);
    let parser = RowParser::new(spec.columns.clone(), spec.dialect);

    let stream = objects
        .open(&spec.input)
        .await
        .map_err(|source| LoadError::Open {
            uri: uri.clone(),
            source,
        })?;
    let reader = StreamReader::new(stream.map_err(io::Error::other));
    let mut segments = reader.split(b'\n');

    let mut report = LoadReport {
        job_name: spec.job_name.clone(),
        ..LoadReport::default()
    };
    let mut batch: Vec<Record> = Vec::with_capacity(batch_size);

    loop {
        let line_number = report.lines_read + 1;
        let segment = segments
            .next_segment()
            .await
            .map_err(|source| LoadError::Read {
                uri: uri.clone(),
                line: line_number,
                source,
            })?;
        let Some(segment) = segment else {
            break;
        };
        report.lines_read = line_number;
        if line_number <= spec.skip_header_lines {
            continue;
        }

        let text = String::from_utf8_lossy(&segment);
        let line = text.strip_suffix('\r').unwrap_or(&text);
        if line.trim().is_empty() {
            report.blank_lines += 1;
            continue;
        }

        let record = parser.parse_line(line).map_err(|source| LoadError::Parse {
            uri: uri.clone(),
            line: line_number,
            source,
        })?;
        batch.push(record);
        if batch.len() >= batch_size {
            report.rows_appended += flush(spec, tables, &mut batch).await?;
        }
    }
    if !batch.is_empty() {
        report.rows_appended += flush(spec, tables, &mut batch).await?;
    }

    tracing::info!(
        job_name = %spec.job_name,
        table = %spec.table_spec(),
        rows = report.rows_appended,
        lines = report.lines_read,
        "Load job finished"
    );
    Ok(report)
}

async fn flush(
    spec: &LoadJobSpec,
    tables: &dyn TableStore,
    batch: &mut Vec<Record>,
) -> Result<usize, LoadError> {
    let rows = std::mem::take(batch);
    let count = rows.len();
    let appended = tables
        .append_rows(&spec.table, rows)
        .await
        .map_err(|source| LoadError::Append {
            table: spec.table_spec(),
            source,
        })?;
    tracing::debug!(table = %spec.table_spec(), count, appended, "Appended batch");
    Ok(appended)
}
