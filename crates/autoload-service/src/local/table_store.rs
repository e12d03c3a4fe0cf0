//! In-process [`TableStore`] holding Arrow record batches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::DataType;
use async_trait::async_trait;
use autoload_core::error::CollaboratorError;
use autoload_core::io::TableStore;
use autoload_core::row::Record;
use autoload_core::types::{DatasetRef, TableRef, TableSchema};

#[derive(Debug, Default)]
struct StoredTable {
    schema: TableSchema,
    batches: Vec<RecordBatch>,
}

#[derive(Debug, Default)]
struct State {
    datasets: HashMap<DatasetRef, String>,
    tables: HashMap<TableRef, StoredTable>,
}

/// Thread-safe table store kept in memory.
///
/// Appended string values are cast to each column's declared type; values that do not
/// parse are stored as nulls.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    state: Mutex<State>,
}

impl MemoryTableStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Location a dataset was created in.
    #[must_use]
    pub fn dataset_location(&self, dataset: &DatasetRef) -> Option<String> {
        self.state().datasets.get(dataset).cloned()
    }

    /// All tables, sorted by their display name.
    #[must_use]
    pub fn tables(&self) -> Vec<TableRef> {
        let mut tables: Vec<TableRef> = self.state().tables.keys().cloned().collect();
        tables.sort_by_key(ToString::to_string);
        tables
    }

    /// Number of rows appended to a table, or `None` if it does not exist.
    #[must_use]
    pub fn row_count(&self, table: &TableRef) -> Option<usize> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.batches.iter().map(RecordBatch::num_rows).sum())
    }

    /// Record batches appended to a table, in append order.
    #[must_use]
    pub fn batches(&self, table: &TableRef) -> Option<Vec<RecordBatch>> {
        self.state().tables.get(table).map(|t| t.batches.clone())
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<(), CollaboratorError> {
        if self.state().datasets.contains_key(dataset) {
            Ok(())
        } else {
            Err(CollaboratorError::NotFound {
                what: format!("dataset {dataset}"),
            })
        }
    }

    async fn create_dataset(
        &self,
        dataset: &DatasetRef,
        location: &str,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state();
        if state.datasets.contains_key(dataset) {
            return Err(CollaboratorError::AlreadyExists {
                what: format!("dataset {dataset}"),
            });
        }
        state.datasets.insert(dataset.clone(), location.to_string());
        Ok(())
    }

    async fn get_table(&self, table: &TableRef) -> Result<TableSchema, CollaboratorError> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.schema.clone())
            .ok_or_else(|| CollaboratorError::NotFound {
                what: format!("table {table}"),
            })
    }

    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), CollaboratorError> {
        let mut state = self.state();
        if !state.datasets.contains_key(&table.dataset_ref()) {
            return Err(CollaboratorError::NotFound {
                what: format!("dataset {}", table.dataset_ref()),
            });
        }
        if state.tables.contains_key(table) {
            return Err(CollaboratorError::AlreadyExists {
                what: format!("table {table}"),
            });
        }
        state.tables.insert(
            table.clone(),
            StoredTable {
                schema: schema.clone(),
                batches: Vec::new(),
            },
        );
        Ok(())
    }

    async fn append_rows(
        &self,
        table: &TableRef,
        rows: Vec<Record>,
    ) -> Result<usize, CollaboratorError> {
        let mut state = self.state();
        let stored = state
            .tables
            .get_mut(table)
            .ok_or_else(|| CollaboratorError::NotFound {
                what: format!("table {table}"),
            })?;
        if rows.is_empty() {
            return Ok(0);
        }

        let batch = records_to_batch(&stored.schema, &rows)
            .map_err(|e| CollaboratorError::backend(format!("append to {table}"), e))?;
        let appended = batch.num_rows();
        stored.batches.push(batch);
        Ok(appended)
    }
}

/// Build a record batch from string records, casting each column to its declared type.
fn records_to_batch(
    schema: &TableSchema,
    rows: &[Record],
) -> Result<RecordBatch, arrow_schema::ArrowError> {
    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let target = field.column_type.to_arrow();
            let values: StringArray = rows
                .iter()
                .map(|row| {
                    let value = row.get(&field.name).map(String::as_str);
                    match value {
                        Some(v) if v.trim().is_empty() && target != DataType::Utf8 => None,
                        Some(v) if target == DataType::Utf8 => Some(v),
                        Some(v) => Some(v.trim()),
                        None => None,
                    }
                })
                .collect();
            let values: ArrayRef = Arc::new(values);
            arrow_cast::cast(&values, &target)
        })
        .collect::<Result<Vec<_>, _>>()?;

    RecordBatch::try_new(Arc::new(schema.to_arrow()), columns)
}
