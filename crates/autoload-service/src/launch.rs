//! Load job specification and submission.

use std::fmt;

use async_trait::async_trait;
use autoload_core::error::{CollaboratorError, LaunchError};
use autoload_core::inference::Dialect;
use autoload_core::types::{IngestionRequest, ObjectLocator, TableRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LaunchOptions;

/// How the load engine treats a missing destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateDisposition {
    /// Fail if the table does not exist.
    CreateNever,
}

/// How the load engine treats existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    /// Append to existing rows.
    WriteAppend,
}

/// Everything a load job needs to re-read one object and append it to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadJobSpec {
    /// Job name: `<prefix>-<yyyymmdd-HHMMSS>`, lowercase.
    pub job_name: String,
    /// Project the job runs in.
    pub project: String,
    /// Region the job runs in.
    pub region: String,
    /// Source object.
    pub input: ObjectLocator,
    /// Destination table.
    pub table: TableRef,
    /// Compact schema string, `name:TYPE,...`.
    pub schema: String,
    /// Column names in source order; rows are mapped onto these.
    pub columns: Vec<String>,
    /// Dialect detected during inference.
    pub dialect: Dialect,
    /// Leading lines to skip (the header).
    pub skip_header_lines: usize,
    /// Temporary storage path.
    pub temp_location: String,
    /// Staging storage path.
    pub staging_location: String,
    /// Identity the job runs as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    /// Behaviour when the table is missing.
    pub create_disposition: CreateDisposition,
    /// Behaviour for existing rows.
    pub write_disposition: WriteDisposition,
}

impl LoadJobSpec {
    /// Storage URI of the input object.
    #[must_use]
    pub fn input_uri(&self) -> String {
        self.input.uri()
    }

    /// Table spec of the destination, `project:dataset.table`.
    #[must_use]
    pub fn table_spec(&self) -> String {
        self.table.table_spec()
    }
}

/// Identifier returned by an executor for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The distributed execution engine.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Submits a job and returns its identifier without waiting for it to run.
    async fn submit(&self, spec: LoadJobSpec) -> Result<JobId, CollaboratorError>;
}

/// Job name for a launch at `now`: `<prefix>-<yyyymmdd-HHMMSS>`, lowercased.
#[must_use]
pub fn job_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}", now.format("%Y%m%d-%H%M%S")).to_lowercase()
}

/// Build the job specification for an ingestion request.
///
/// # Errors
///
/// Returns [`LaunchError::MissingLocation`] if the temp or staging location is unset, and
/// [`LaunchError::EmptyColumns`] if the request has no columns.
pub fn build_job_spec(
    request: &IngestionRequest,
    options: &LaunchOptions,
    region: &str,
    now: DateTime<Utc>,
) -> Result<LoadJobSpec, LaunchError> {
    let temp_location = require_location(options.temp_location.as_deref(), "DF_TEMP_LOCATION")?;
    let staging_location =
        require_location(options.staging_location.as_deref(), "DF_STAGING_LOCATION")?;
    if request.inferred.columns.is_empty() {
        return Err(LaunchError::EmptyColumns);
    }

    Ok(LoadJobSpec {
        job_name: job_name(&options.job_name_prefix, now),
        project: request.table.project.clone(),
        region: region.to_string(),
        input: request.locator.clone(),
        table: request.table.clone(),
        schema: request.inferred.schema.schema_string(),
        columns: request.inferred.columns.clone(),
        dialect: request.inferred.dialect,
        skip_header_lines: 1,
        temp_location,
        staging_location,
        service_account: options.service_account.clone(),
        create_disposition: CreateDisposition::CreateNever,
        write_disposition: WriteDisposition::WriteAppend,
    })
}

fn require_location(value: Option<&str>, option: &str) -> Result<String, LaunchError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(LaunchError::MissingLocation {
            option: option.to_string(),
        }),
    }
}

/// Build and submit the load job for `request`. Returns as soon as the executor accepts it.
///
/// # Errors
///
/// Returns the [`build_job_spec`] errors, or [`LaunchError::Submit`] if the executor rejects
/// the job.
pub async fn launch(
    executor: &dyn JobExecutor,
    request: &IngestionRequest,
    options: &LaunchOptions,
    region: &str,
) -> Result<(JobId, LoadJobSpec), LaunchError> {
    let spec = build_job_spec(request, options, region, Utc::now())?;
    let job_name = spec.job_name.clone();

    let job_id = executor
        .submit(spec.clone())
        .await
        .map_err(|source| LaunchError::Submit {
            job_name: job_name.clone(),
            source,
        })?;

    tracing::info!(
        job_id = %job_id,
        job_name = %job_name,
        input = %spec.input_uri(),
        table = %spec.table_spec(),
        "Submitted load job"
    );
    Ok((job_id, spec))
}

#[cfg(test)]
mod tests {
    use autoload_core::inference::infer_from_text;
    use autoload_core::types::DatasetRef;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn request() -> IngestionRequest {
        let inferred = infer_from_text("id,name\n7,a\n", "incoming/x.csv", 200).unwrap();
        IngestionRequest::new(
            ObjectLocator::new("b", "incoming/x.csv"),
            inferred,
            DatasetRef::new("proj", "csv_ingest").table("csv_x"),
        )
    }

    fn options() -> LaunchOptions {
        LaunchOptions {
            temp_location: Some("gs://b/tmp".to_string()),
            staging_location: Some("gs://b/staging".to_string()),
            ..LaunchOptions::default()
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 9).unwrap()
    }

    #[test]
    fn test_job_name() {
        assert_eq!(job_name("csv-to-bq", noon()), "csv-to-bq-20240305-120009");
        assert_eq!(job_name("CSV-Load", noon()), "csv-load-20240305-120009");
    }

    #[test]
    fn test_build_job_spec() {
        let spec = build_job_spec(&request(), &options(), "us-central1", noon()).unwrap();

        assert_eq!(spec.job_name, "csv-to-bq-20240305-120009");
        assert_eq!(spec.input_uri(), "gs://b/incoming/x.csv");
        assert_eq!(spec.table_spec(), "proj:csv_ingest.csv_x");
        assert_eq!(spec.schema, "id:INT64,name:STRING");
        assert_eq!(spec.columns, vec!["id", "name"]);
        assert_eq!(spec.skip_header_lines, 1);
        assert_eq!(spec.create_disposition, CreateDisposition::CreateNever);
        assert_eq!(spec.write_disposition, WriteDisposition::WriteAppend);
        assert_eq!(spec.service_account, None);
    }

    #[test]
    fn test_spec_serializes_dispositions() {
        let spec = build_job_spec(&request(), &options(), "us-central1", noon()).unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["create_disposition"], "CREATE_NEVER");
        assert_eq!(json["write_disposition"], "WRITE_APPEND");
        assert!(json.get("service_account").is_none());
    }

    #[test]
    fn test_missing_locations() {
        let mut opts = options();
        opts.staging_location = Some("  ".to_string());
        let err = build_job_spec(&request(), &opts, "r", noon()).unwrap_err();
        assert!(
            matches!(err, LaunchError::MissingLocation { ref option } if option == "DF_STAGING_LOCATION")
        );

        let err = build_job_spec(&request(), &LaunchOptions::default(), "r", noon()).unwrap_err();
        assert!(
            matches!(err, LaunchError::MissingLocation { ref option } if option == "DF_TEMP_LOCATION")
        );
    }

    #[test]
    fn test_empty_columns() {
        let mut req = request();
        req.inferred.columns.clear();
        let err = build_job_spec(&req, &options(), "r", noon()).unwrap_err();
        assert!(matches!(err, LaunchError::EmptyColumns));
    }

    struct Rejecting;

    #[async_trait]
    impl JobExecutor for Rejecting {
        async fn submit(&self, _spec: LoadJobSpec) -> Result<JobId, CollaboratorError> {
            Err(CollaboratorError::backend("submit job", "quota exceeded"))
        }
    }

    #[tokio::test]
    async fn test_submit_failure() {
        let err = launch(&Rejecting, &request(), &options(), "r").await.unwrap_err();
        assert!(matches!(err, LaunchError::Submit { .. }));
        assert!(err.to_string().ends_with("submit job: quota exceeded"));
    }
}
