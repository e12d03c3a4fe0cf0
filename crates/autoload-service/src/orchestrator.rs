//! The ingestion orchestrator.
//!
//! One [`Orchestrator::process`] call is one pass over one notification:
//! decode → extract → filter → infer → provision → launch. Passes share nothing but the
//! collaborators, and provisioning is idempotent, so concurrent passes need no locking.
//! A redelivered notification runs the whole pass again and submits another job.

use std::sync::Arc;

use autoload_core::inference::infer_from_object;
use autoload_core::io::{ObjectSource, TableStore};
use autoload_core::naming::table_name_for_object;
use autoload_core::types::{DatasetRef, IngestionRequest, ObjectLocator, TableRef};
use autoload_core::{AutoloadError, Disposition, Result};
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::envelope::{NotificationEnvelope, decode_push};
use crate::extract::{Decision, SkipReason, evaluate, extract_locator};
use crate::launch::{JobExecutor, JobId, launch};
use crate::provision::{ensure_dataset, ensure_table};
use crate::response::HandlerResponse;

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A load job was submitted.
    Launched {
        /// Executor job identifier
        job_id: JobId,
        /// Source object
        locator: ObjectLocator,
        /// Destination table
        table: TableRef,
    },
    /// The object did not pass the filter; nothing was done.
    Skipped {
        /// The object that was skipped
        locator: ObjectLocator,
        /// Why it was skipped
        reason: SkipReason,
    },
}

/// Runs notification passes against a fixed configuration and set of collaborators.
#[derive(Clone)]
pub struct Orchestrator<'a> {
    config: &'a ServiceConfig,
    objects: Arc<dyn ObjectSource>,
    tables: Arc<dyn TableStore>,
    executor: Arc<dyn JobExecutor>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator.
    pub fn new(
        config: &'a ServiceConfig,
        objects: Arc<dyn ObjectSource>,
        tables: Arc<dyn TableStore>,
        executor: Arc<dyn JobExecutor>,
    ) -> Self {
        Self {
            config,
            objects,
            tables,
            executor,
        }
    }

    /// The configuration passes run with.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        self.config
    }

    /// Handle a raw request body. Bodies that are not JSON are treated as `{}`.
    pub async fn handle_bytes(&self, body: &[u8]) -> HandlerResponse {
        let value = serde_json::from_slice::<Value>(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Request body is not JSON");
            Value::Object(serde_json::Map::new())
        });
        self.handle(&value).await
    }

    /// Handle a decoded request body and map the result onto a response.
    pub async fn handle(&self, body: &Value) -> HandlerResponse {
        let result = match decode_push(body) {
            Ok(envelope) => self.process(&envelope).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(outcome) => HandlerResponse::from_outcome(&outcome),
            Err(err) => {
                match err.disposition() {
                    Disposition::Permanent => {
                        tracing::warn!(error = %err, "Rejected notification");
                    },
                    Disposition::Transient => {
                        tracing::error!(error = %err, "Notification pass failed");
                    },
                }
                HandlerResponse::from_error(&err)
            },
        }
    }

    /// Run one pass over a decoded notification.
    ///
    /// # Errors
    ///
    /// Returns [`AutoloadError::Extraction`] if no locator can be found; every later failure
    /// (missing project, inference, provisioning, launch) is returned as its own variant.
    pub async fn process(&self, envelope: &NotificationEnvelope) -> Result<Outcome> {
        let locator = extract_locator(envelope)?;
        tracing::info!(container = %locator.container, path = %locator.path, "Received notification");

        if let Decision::Skip(reason) = evaluate(&locator, self.config) {
            tracing::info!(%locator, %reason, "Skipping object");
            return Ok(Outcome::Skipped { locator, reason });
        }

        let project = self.config.require_project()?;
        let inferred =
            infer_from_object(self.objects.as_ref(), &locator, &self.config.inference).await?;

        let dataset = DatasetRef::new(project, &self.config.dataset);
        ensure_dataset(self.tables.as_ref(), &dataset, &self.config.region).await?;
        let table = dataset.table(table_name_for_object(&locator.path, &self.config.table_prefix));
        ensure_table(self.tables.as_ref(), &table, &inferred.schema).await?;

        let request = IngestionRequest::new(locator, inferred, table);
        let (job_id, _spec) = launch(
            self.executor.as_ref(),
            &request,
            &self.config.launch,
            &self.config.region,
        )
        .await?;

        Ok(Outcome::Launched {
            job_id,
            locator: request.locator,
            table: request.table,
        })
    }
}

impl From<Outcome> for HandlerResponse {
    fn from(outcome: Outcome) -> Self {
        HandlerResponse::from_outcome(&outcome)
    }
}

impl From<AutoloadError> for HandlerResponse {
    fn from(err: AutoloadError) -> Self {
        HandlerResponse::from_error(&err)
    }
}
