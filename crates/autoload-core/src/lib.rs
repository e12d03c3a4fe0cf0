//! `autoload-core` holds the pieces of Autoload that do not talk to the network on their own:
//! the data model, the schema inference engine, identifier sanitization, the row parser used
//! by load jobs, and the error taxonomy shared by every crate in the workspace.
//!
//! This crate includes:
//! - **Data model** ([`types`]): column types, schema fields, object locators, table references.
//! - **Inference** ([`inference`]): sampling, dialect sniffing, per-cell classification and the
//!   column type lattice.
//! - **Naming** ([`naming`]): identifier sanitization and table-name derivation.
//! - **Row parsing** ([`row`]): one delimited line to a name-keyed record.
//! - **Collaborators** ([`io`]): traits for the object store and table store.
//!
//! # Example
//!
//! ```
//! use autoload_core::inference::infer_from_text;
//! use autoload_core::types::ColumnType;
//!
//! let csv = "id,amount,seen_at\n1,10.5,2024-01-01\n2,7,2024-01-02T10:00:00\n";
//! let inferred = infer_from_text(csv, "incoming/orders.csv", 200).unwrap();
//!
//! assert_eq!(inferred.schema.schema_string(), "id:INT64,amount:FLOAT64,seen_at:TIMESTAMP");
//! assert_eq!(inferred.schema.fields()[0].column_type, ColumnType::Int64);
//! ```

pub mod error;
pub mod inference;
pub mod io;
pub mod naming;
pub mod row;
pub mod types;

pub use error::{AutoloadError, Disposition, Result};
