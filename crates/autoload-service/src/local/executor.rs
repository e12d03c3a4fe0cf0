//! [`JobExecutor`] that runs load jobs as tokio tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use autoload_core::error::{CollaboratorError, LoadError};
use autoload_core::io::{ObjectSource, TableStore};
use tokio::task::JoinHandle;

use crate::launch::{JobExecutor, JobId, LoadJobSpec};
use crate::load::{DEFAULT_BATCH_SIZE, LoadReport, run_load_job};

struct PendingJob {
    job_id: JobId,
    spec: LoadJobSpec,
    handle: JoinHandle<Result<LoadReport, LoadError>>,
}

/// Runs submitted jobs in the background on the current tokio runtime.
///
/// [`JobExecutor::submit`] returns as soon as the task is spawned; [`LocalExecutor::wait`]
/// collects the results and forgets the jobs it waited for.
pub struct LocalExecutor {
    objects: Arc<dyn ObjectSource>,
    tables: Arc<dyn TableStore>,
    batch_size: usize,
    next_id: AtomicU64,
    pending: Mutex<Vec<PendingJob>>,
}

impl LocalExecutor {
    /// An executor reading from `objects` and writing to `tables`.
    pub fn new(objects: Arc<dyn ObjectSource>, tables: Arc<dyn TableStore>) -> Self {
        Self {
            objects,
            tables,
            batch_size: DEFAULT_BATCH_SIZE,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Set the number of records per append call
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn pending(&self) -> MutexGuard<'_, Vec<PendingJob>> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Jobs submitted since the last [`LocalExecutor::wait`], in submission order.
    #[must_use]
    pub fn submitted(&self) -> Vec<(JobId, LoadJobSpec)> {
        self.pending()
            .iter()
            .map(|job| (job.job_id.clone(), job.spec.clone()))
            .collect()
    }

    /// Wait for every pending job and drop it from the executor.
    pub async fn wait(&self) -> Vec<(JobId, Result<LoadReport, LoadError>)> {
        let pending = std::mem::take(&mut *self.pending());
        let mut results = Vec::with_capacity(pending.len());
        for PendingJob { job_id, handle, .. } in pending {
            let result = handle.await.unwrap_or_else(|e| {
                Err(LoadError::Aborted {
                    job_id: job_id.to_string(),
                    message: e.to_string(),
                })
            });
            if let Err(e) = &result {
                tracing::error!(job_id = %job_id, error = %e, "Load job failed");
            }
            results.push((job_id, result));
        }
        results
    }
}

#[async_trait]
impl JobExecutor for LocalExecutor {
    async fn submit(&self, spec: LoadJobSpec) -> Result<JobId, CollaboratorError> {
        let job_id = JobId(format!(
            "local-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));

        let objects = Arc::clone(&self.objects);
        let tables = Arc::clone(&self.tables);
        let batch_size = self.batch_size;
        let task_spec = spec.clone();
        let handle = tokio::spawn(async move {
            run_load_job(&task_spec, objects.as_ref(), tables.as_ref(), batch_size).await
        });

        self.pending().push(PendingJob {
            job_id: job_id.clone(),
            spec,
            handle,
        });
        Ok(job_id)
    }
}
