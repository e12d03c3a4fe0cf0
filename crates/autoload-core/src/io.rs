//! Collaborator traits.
//!
//! The orchestrator and the load job talk to storage only through these traits. Production
//! and local implementations live in `autoload-service`.

use std::ops::Range;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::CollaboratorError;
use crate::row::Record;
use crate::types::{DatasetRef, ObjectLocator, TableRef, TableSchema};

/// Stream of object bytes returned by [`ObjectSource::open`].
pub type ByteStream = BoxStream<'static, Result<Bytes, CollaboratorError>>;

/// Read access to source objects.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Reads a byte range of an object.
    ///
    /// The range is clamped to the object size, so a range past the end yields fewer bytes
    /// (possibly none) rather than an error. A missing object is
    /// [`CollaboratorError::NotFound`].
    async fn read_range(
        &self,
        locator: &ObjectLocator,
        range: Range<u64>,
    ) -> Result<Bytes, CollaboratorError>;

    /// Streams the whole object. Used by load jobs, never by the orchestrator.
    async fn open(&self, locator: &ObjectLocator) -> Result<ByteStream, CollaboratorError>;
}

/// The destination table store.
///
/// `create_*` calls report [`CollaboratorError::AlreadyExists`] when the resource was created
/// concurrently; `get_*` calls report [`CollaboratorError::NotFound`] for missing resources.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Looks up a dataset.
    async fn get_dataset(&self, dataset: &DatasetRef) -> Result<(), CollaboratorError>;

    /// Creates a dataset in the given location.
    async fn create_dataset(
        &self,
        dataset: &DatasetRef,
        location: &str,
    ) -> Result<(), CollaboratorError>;

    /// Looks up a table and returns its schema.
    async fn get_table(&self, table: &TableRef) -> Result<TableSchema, CollaboratorError>;

    /// Creates a table with the given schema.
    async fn create_table(
        &self,
        table: &TableRef,
        schema: &TableSchema,
    ) -> Result<(), CollaboratorError>;

    /// Appends rows to an existing table, coercing string values to the declared column
    /// types. Returns the number of rows appended.
    async fn append_rows(
        &self,
        table: &TableRef,
        rows: Vec<Record>,
    ) -> Result<usize, CollaboratorError>;
}
