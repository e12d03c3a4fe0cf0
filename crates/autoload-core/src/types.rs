//! Data types shared by the inference engine, the orchestrator and load jobs.
//!
//! Everything here lives for a single notification pass; the only durable state is in the
//! object store and the table store.

use std::fmt;
use std::str::FromStr;

use arrow_schema::{DataType, Field, Schema, TimeUnit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::Dialect;

/// Column type of an inferred schema.
///
/// The types form a join semilattice (see [`ColumnType::merge`]) with
/// [`ColumnType::String`] as the top element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Calendar date without time of day.
    Date,
    /// Date and time.
    Timestamp,
    /// UTF-8 text; absorbs every conflict.
    String,
}

impl ColumnType {
    /// All column types, in declaration order.
    pub const ALL: [ColumnType; 6] = [
        Self::Bool,
        Self::Int64,
        Self::Float64,
        Self::Date,
        Self::Timestamp,
        Self::String,
    ];

    /// Returns the table-store name of this type (e.g. `INT64`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::String => "STRING",
        }
    }

    /// Arrow representation used by in-process table stores.
    #[must_use]
    pub fn to_arrow(&self) -> DataType {
        match self {
            Self::Bool => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Date => DataType::Date32,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            Self::String => DataType::Utf8,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown column type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown column type '{0}'")]
pub struct UnknownColumnType(pub String);

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownColumnType(s.to_string()))
    }
}

/// A single named, typed column of a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Sanitized column name matching `[A-Za-z_][A-Za-z0-9_]*`.
    pub name: String,
    /// Merged column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Always `true`; every inferred column is nullable.
    pub nullable: bool,
    /// Provenance of the field.
    pub description: String,
}

impl SchemaField {
    /// Create a nullable field.
    pub fn new(
        name: impl Into<String>,
        column_type: ColumnType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            description: description.into(),
        }
    }
}

/// Ordered list of fields describing a destination table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    fields: Vec<SchemaField>,
}

impl TableSchema {
    /// Create a schema from fields.
    #[must_use]
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Compact schema string understood by the load engine: `a:STRING,b:INT64`.
    #[must_use]
    pub fn schema_string(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.column_type))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Arrow schema with one nullable field per column.
    #[must_use]
    pub fn to_arrow(&self) -> Schema {
        Schema::new(
            self.fields
                .iter()
                .map(|f| Field::new(&f.name, f.column_type.to_arrow(), f.nullable))
                .collect::<Vec<_>>(),
        )
    }
}

/// Identifies a source object by container (bucket) and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocator {
    /// Container (bucket) name.
    pub container: String,
    /// Object path inside the container.
    pub path: String,
}

impl ObjectLocator {
    /// Create a locator.
    pub fn new(container: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            path: path.into(),
        }
    }

    /// Storage URI of the object, e.g. `gs://bucket/incoming/file.csv`.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.container, self.path)
    }

    /// Final path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Identifies a destination dataset (container of tables).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Owning project.
    pub project: String,
    /// Dataset name.
    pub dataset: String,
}

impl DatasetRef {
    /// Create a dataset reference.
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    /// Reference a table inside this dataset.
    #[must_use]
    pub fn table(&self, table: impl Into<String>) -> TableRef {
        TableRef {
            project: self.project.clone(),
            dataset: self.dataset.clone(),
            table: table.into(),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.dataset)
    }
}

/// Identifies a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Owning project.
    pub project: String,
    /// Dataset name.
    pub dataset: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// The dataset containing this table.
    #[must_use]
    pub fn dataset_ref(&self) -> DatasetRef {
        DatasetRef::new(&self.project, &self.dataset)
    }

    /// Table spec understood by the load engine: `project:dataset.table`.
    #[must_use]
    pub fn table_spec(&self) -> String {
        format!("{}:{}.{}", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Output of schema inference: the schema, the parallel column-name list and the dialect
/// the sample was read with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredSchema {
    /// Sanitized, typed fields in source column order.
    pub schema: TableSchema,
    /// Sanitized column names, parallel to `schema`.
    pub columns: Vec<String>,
    /// Delimiter and quote convention detected in the sample.
    pub dialect: Dialect,
    /// Number of data rows (header excluded) that were classified.
    pub sampled_rows: usize,
}

/// Everything one orchestration pass knows once inference has finished.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    /// Source object.
    pub locator: ObjectLocator,
    /// Inferred schema and column list.
    pub inferred: InferredSchema,
    /// Destination table.
    pub table: TableRef,
}

impl IngestionRequest {
    /// Bundle the pieces of a pass.
    #[must_use]
    pub fn new(locator: ObjectLocator, inferred: InferredSchema, table: TableRef) -> Self {
        Self {
            locator,
            inferred,
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_names_round_trip() {
        for t in ColumnType::ALL {
            assert_eq!(t.as_str().parse::<ColumnType>(), Ok(t));
        }
        assert_eq!("int64".parse::<ColumnType>(), Ok(ColumnType::Int64));
        assert_eq!(
            "DECIMAL".parse::<ColumnType>(),
            Err(UnknownColumnType("DECIMAL".to_string()))
        );
    }

    #[test]
    fn test_column_type_serde_uses_wire_names() {
        let json = serde_json::to_string(&ColumnType::Float64).unwrap();
        assert_eq!(json, "\"FLOAT64\"");
        let parsed: ColumnType = serde_json::from_str("\"TIMESTAMP\"").unwrap();
        assert_eq!(parsed, ColumnType::Timestamp);
    }

    #[test]
    fn test_schema_string_and_names() {
        let schema = TableSchema::new(vec![
            SchemaField::new("a", ColumnType::String, ""),
            SchemaField::new("b", ColumnType::Int64, ""),
        ]);
        assert_eq!(schema.schema_string(), "a:STRING,b:INT64");
        assert_eq!(schema.column_names(), vec!["a", "b"]);
        assert!(schema.fields().iter().all(|f| f.nullable));

        let arrow = schema.to_arrow();
        assert_eq!(arrow.field(1).data_type(), &DataType::Int64);
        assert!(arrow.field(0).is_nullable());
    }

    #[test]
    fn test_locator_and_table_formatting() {
        let locator = ObjectLocator::new("bucket", "incoming/x.csv");
        assert_eq!(locator.uri(), "gs://bucket/incoming/x.csv");
        assert_eq!(locator.file_name(), "x.csv");

        let table = DatasetRef::new("proj", "csv_ingest").table("csv_x");
        assert_eq!(table.table_spec(), "proj:csv_ingest.csv_x");
        assert_eq!(table.to_string(), "proj.csv_ingest.csv_x");
        assert_eq!(table.dataset_ref().to_string(), "proj.csv_ingest");
    }
}
