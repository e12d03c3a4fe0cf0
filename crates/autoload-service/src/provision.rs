//! Idempotent dataset and table provisioning.

use autoload_core::error::{CollaboratorError, ProvisionError};
use autoload_core::io::TableStore;
use autoload_core::types::{DatasetRef, TableRef, TableSchema};

/// What an ensure call found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The resource already existed; nothing was changed.
    Existing,
    /// The resource was created by this call.
    Created,
    /// Creation raced with another creator, which won.
    CreatedConcurrently,
}

/// Make sure `dataset` exists, creating it in `location` if needed.
///
/// # Errors
///
/// Returns [`ProvisionError::Dataset`] if the lookup fails for any reason other than the
/// dataset being absent, or if creation fails with anything other than "already exists".
pub async fn ensure_dataset(
    store: &dyn TableStore,
    dataset: &DatasetRef,
    location: &str,
) -> Result<ProvisionOutcome, ProvisionError> {
    let wrap = |source| ProvisionError::Dataset {
        dataset: dataset.to_string(),
        source,
    };

    match store.get_dataset(dataset).await {
        Ok(()) => return Ok(ProvisionOutcome::Existing),
        Err(e) if e.is_not_found() => {},
        Err(e) => return Err(wrap(e)),
    }

    tracing::info!(dataset = %dataset, location, "Creating dataset");
    created(store.create_dataset(dataset, location).await).map_err(wrap)
}

/// Make sure `table` exists, creating it with `schema` if needed.
///
/// An existing table keeps its schema; `schema` is only used on first creation.
///
/// # Errors
///
/// Returns [`ProvisionError::Table`] under the same conditions as [`ensure_dataset`].
pub async fn ensure_table(
    store: &dyn TableStore,
    table: &TableRef,
    schema: &TableSchema,
) -> Result<ProvisionOutcome, ProvisionError> {
    let wrap = |source| ProvisionError::Table {
        table: table.to_string(),
        source,
    };

    match store.get_table(table).await {
        Ok(existing) => {
            if existing != *schema {
                tracing::debug!(
                    table = %table,
                    existing = %existing.schema_string(),
                    inferred = %schema.schema_string(),
                    "Table exists with a different schema; keeping it"
                );
            }
            return Ok(ProvisionOutcome::Existing);
        },
        Err(e) if e.is_not_found() => {},
        Err(e) => return Err(wrap(e)),
    }

    tracing::info!(table = %table, columns = schema.len(), "Creating table");
    created(store.create_table(table, schema).await).map_err(wrap)
}

fn created(result: Result<(), CollaboratorError>) -> Result<ProvisionOutcome, CollaboratorError> {
    match result {
        Ok(()) => Ok(ProvisionOutcome::Created),
        Err(e) if e.is_already_exists() => Ok(ProvisionOutcome::CreatedConcurrently),
        Err(e) => Err(e),
    }
}
