//! `autoload-service` turns storage-change notifications into load jobs.
//!
//! The [`Orchestrator`] decodes a push envelope, extracts the object locator, filters it,
//! samples the object to infer a schema, provisions the destination dataset and table and
//! submits a load job. The load job itself ([`load::run_load_job`]) streams the full object
//! into the table.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use autoload_service::local::{LocalExecutor, MemoryTableStore, ObjectStoreSource};
//! use autoload_service::{Orchestrator, ServiceConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ServiceConfig::from_env()?;
//! let objects = Arc::new(ObjectStoreSource::gcs());
//! let tables = Arc::new(MemoryTableStore::new());
//! let executor = Arc::new(LocalExecutor::new(objects.clone(), tables.clone()));
//! let orchestrator = Orchestrator::new(&config, objects, tables, executor);
//!
//! let response = orchestrator.handle_bytes(br#"{"message": {}}"#).await;
//! assert_eq!(response.status, 400);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod extract;
pub mod launch;
pub mod load;
pub mod local;
pub mod orchestrator;
pub mod provision;
pub mod response;

pub use config::{LaunchOptions, ServiceConfig};
pub use envelope::{NotificationEnvelope, decode_push};
pub use extract::{Decision, SkipReason};
pub use launch::{JobExecutor, JobId, LoadJobSpec};
pub use load::{LoadReport, run_load_job};
pub use orchestrator::{Orchestrator, Outcome};
pub use response::HandlerResponse;
