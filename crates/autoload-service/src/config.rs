//! Service configuration.
//!
//! [`ServiceConfig`] is built once at startup and handed to the orchestrator by reference.
//! Components never read the environment themselves.

use std::str::FromStr;

use autoload_core::error::ConfigError;
use autoload_core::inference::InferenceOptions;

/// Options used when building and submitting load jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Temporary storage path for the load engine. Mandatory at launch.
    pub temp_location: Option<String>,
    /// Staging storage path for the load engine. Mandatory at launch.
    pub staging_location: Option<String>,
    /// Identity the job runs as.
    pub service_account: Option<String>,
    /// Prefix of generated job names (default: `csv-to-bq`)
    pub job_name_prefix: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            temp_location: None,
            staging_location: None,
            service_account: None,
            job_name_prefix: "csv-to-bq".to_string(),
        }
    }
}

/// Immutable service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Project owning the destination datasets. Required once a notification is accepted.
    pub project_id: Option<String>,
    /// Location for new datasets and load jobs (default: `us-central1`)
    pub region: String,
    /// Only accept notifications for this container. `None` accepts any.
    pub container: Option<String>,
    /// Only accept objects under this path prefix; empty accepts any (default: `incoming/`)
    pub path_prefix: String,
    /// Destination dataset (default: `csv_ingest`)
    pub dataset: String,
    /// Prefix for derived table names (default: `csv_`)
    pub table_prefix: String,
    /// Sampling options for schema inference
    pub inference: InferenceOptions,
    /// Load job options
    pub launch: LaunchOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: "us-central1".to_string(),
            container: None,
            path_prefix: "incoming/".to_string(),
            dataset: "csv_ingest".to_string(),
            table_prefix: "csv_".to_string(),
            inference: InferenceOptions::default(),
            launch: LaunchOptions::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through a variable lookup function.
    ///
    /// Empty values of optional variables count as unset. `PREFIX` is the exception: an
    /// explicitly empty prefix disables the prefix filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if a numeric variable does not parse, the sample
    /// line count is zero, or the window ceiling is smaller than the initial window.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let sample_lines = parse_var(&lookup, "SCHEMA_SAMPLE_LINES")?;
        let initial_window = parse_var(&lookup, "SAMPLE_WINDOW_BYTES")?;
        let max_window = parse_var(&lookup, "SAMPLE_MAX_BYTES")?;
        let inference = InferenceOptions::new()
            .with_sample_lines(sample_lines.unwrap_or(defaults.inference.sample_lines))
            .with_initial_window(initial_window.unwrap_or(defaults.inference.initial_window))
            .with_max_window(max_window.unwrap_or(defaults.inference.max_window));

        let config = Self {
            project_id: non_empty("PROJECT_ID"),
            region: non_empty("REGION").unwrap_or(defaults.region),
            container: non_empty("BUCKET"),
            path_prefix: lookup("PREFIX").unwrap_or(defaults.path_prefix),
            dataset: non_empty("BQ_DATASET").unwrap_or(defaults.dataset),
            table_prefix: lookup("TABLE_PREFIX").unwrap_or(defaults.table_prefix),
            inference,
            launch: LaunchOptions {
                temp_location: non_empty("DF_TEMP_LOCATION"),
                staging_location: non_empty("DF_STAGING_LOCATION"),
                service_account: non_empty("DATAFLOW_SA_EMAIL"),
                job_name_prefix: non_empty("JOB_NAME_PREFIX")
                    .unwrap_or(defaults.launch.job_name_prefix),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for a zero sample line count, a zero initial
    /// window, or a ceiling below the initial window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inference.sample_lines == 0 {
            return Err(invalid("SCHEMA_SAMPLE_LINES", "must be at least 1"));
        }
        if self.inference.initial_window == 0 {
            return Err(invalid("SAMPLE_WINDOW_BYTES", "must be at least 1"));
        }
        if self.inference.max_window < self.inference.initial_window {
            return Err(invalid(
                "SAMPLE_MAX_BYTES",
                "must not be smaller than SAMPLE_WINDOW_BYTES",
            ));
        }
        Ok(())
    }

    /// The configured project.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] if `PROJECT_ID` was not set.
    pub fn require_project(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired {
                option: "PROJECT_ID".to_string(),
            })
    }

    /// Set the project
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the region
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Restrict notifications to one container
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Set the path prefix filter
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Set the destination dataset
    #[must_use]
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the table name prefix
    #[must_use]
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the inference options
    #[must_use]
    pub fn with_inference(mut self, inference: InferenceOptions) -> Self {
        self.inference = inference;
        self
    }

    /// Set the temp and staging locations of load jobs
    #[must_use]
    pub fn with_locations(
        mut self,
        temp_location: impl Into<String>,
        staging_location: impl Into<String>,
    ) -> Self {
        self.launch.temp_location = Some(temp_location.into());
        self.launch.staging_location = Some(staging_location.into());
        self
    }

    /// Set the identity load jobs run as
    #[must_use]
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.launch.service_account = Some(account.into());
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| invalid(key, &format!("'{raw}' is not a valid number: {e}"))),
        _ => Ok(None),
    }
}

fn invalid(option: &str, message: &str) -> ConfigError {
    ConfigError::InvalidOption {
        option: option.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.region, "us-central1");
        assert_eq!(config.path_prefix, "incoming/");
        assert_eq!(config.dataset, "csv_ingest");
        assert_eq!(config.table_prefix, "csv_");
        assert_eq!(config.inference.sample_lines, 200);
        assert_eq!(config.inference.initial_window, 262_144);
        assert_eq!(config.inference.max_window, 4_194_304);
        assert_eq!(config.launch.job_name_prefix, "csv-to-bq");
        assert!(config.container.is_none());
        assert!(config.launch.temp_location.is_none());
    }

    #[test]
    fn test_reads_variables() {
        let config = config_from(&[
            ("PROJECT_ID", "proj"),
            ("REGION", "europe-west1"),
            ("BUCKET", "landing"),
            ("PREFIX", ""),
            ("BQ_DATASET", "raw"),
            ("TABLE_PREFIX", "t_"),
            ("SCHEMA_SAMPLE_LINES", "50"),
            ("DF_TEMP_LOCATION", "gs://b/tmp"),
            ("DF_STAGING_LOCATION", "gs://b/staging"),
            ("DATAFLOW_SA_EMAIL", ""),
        ])
        .unwrap();

        assert_eq!(config.require_project().unwrap(), "proj");
        assert_eq!(config.region, "europe-west1");
        assert_eq!(config.container.as_deref(), Some("landing"));
        assert_eq!(config.path_prefix, "");
        assert_eq!(config.dataset, "raw");
        assert_eq!(config.table_prefix, "t_");
        assert_eq!(config.inference.sample_lines, 50);
        assert_eq!(config.launch.temp_location.as_deref(), Some("gs://b/tmp"));
        assert_eq!(config.launch.service_account, None);
    }

    #[test]
    fn test_invalid_numbers() {
        let err = config_from(&[("SCHEMA_SAMPLE_LINES", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "SCHEMA_SAMPLE_LINES"));

        let err = config_from(&[("SCHEMA_SAMPLE_LINES", "0")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid SCHEMA_SAMPLE_LINES option: must be at least 1"
        );

        let err = config_from(&[("SAMPLE_WINDOW_BYTES", "1024"), ("SAMPLE_MAX_BYTES", "512")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "SAMPLE_MAX_BYTES"));
    }

    #[test]
    fn test_missing_project() {
        let err = ServiceConfig::new().require_project().unwrap_err();
        assert_eq!(err.to_string(), "Missing required option: PROJECT_ID");
    }

    #[test]
    fn test_builder() {
        let config = ServiceConfig::new()
            .with_project_id("p")
            .with_container("b")
            .with_path_prefix("")
            .with_locations("gs://b/tmp", "gs://b/staging")
            .with_service_account("sa@p.iam");
        assert_eq!(config.project_id.as_deref(), Some("p"));
        assert_eq!(config.container.as_deref(), Some("b"));
        assert_eq!(config.launch.staging_location.as_deref(), Some("gs://b/staging"));
        assert_eq!(config.launch.service_account.as_deref(), Some("sa@p.iam"));
    }
}
