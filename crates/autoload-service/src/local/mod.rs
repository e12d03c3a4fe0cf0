//! In-process collaborators.
//!
//! These back the CLI and the tests. [`ObjectStoreSource`] can also read real buckets.

mod executor;
mod object_source;
mod table_store;

pub use executor::LocalExecutor;
pub use object_source::{ObjectStoreSource, parse_object_uri};
pub use table_store::MemoryTableStore;
