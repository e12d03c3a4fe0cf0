//! Command-line interface for Autoload.
//!
//! The binary drives the [`autoload_service`] orchestrator against local collaborators: a
//! filesystem-backed object store, the in-memory table store and the in-process executor.
//! It is meant for trying notifications end-to-end and for checking what schema a file
//! would get before it is uploaded.
//!
//! # Available Commands
//!
//! - `handle` - Run one push notification through the full ingestion pass
//! - `infer` - Infer and print the schema of a delimited file

mod display;

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use autoload_core::inference::{InferenceOptions, infer_from_object};
use autoload_core::types::ObjectLocator;
use autoload_service::local::{LocalExecutor, MemoryTableStore, ObjectStoreSource, parse_object_uri};
use autoload_service::{Orchestrator, ServiceConfig};

use crate::display::{JobRow, display_inferred_schema, display_jobs};

#[derive(Parser)]
#[command(
    name = "autoload",
    version,
    about = "Notification-driven CSV ingestion",
    long_about = "Autoload samples newly uploaded delimited files, infers a column schema,\n\
                  provisions the destination table and launches a bulk load job."
)]
/// Command-line arguments and options for the Autoload CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the Autoload CLI.
#[derive(Subcommand)]
enum Commands {
    /// Runs one push notification through the ingestion pass.
    ///
    /// Service settings are read from the environment (`PROJECT_ID`, `PREFIX`,
    /// `DF_TEMP_LOCATION`, ...); the flags below override them.
    Handle {
        /// Path to the push request body (JSON), or `-` to read standard input.
        #[arg(value_name = "ENVELOPE_JSON")]
        envelope: String,

        /// Directory holding one sub-directory per storage container.
        #[arg(long, value_name = "DIR")]
        root: PathBuf,

        /// Wait for submitted load jobs and print the loaded row counts.
        #[arg(long)]
        wait: bool,

        /// Print each submitted job specification as JSON.
        #[arg(long)]
        print_spec: bool,

        /// Destination project (overrides `PROJECT_ID`).
        #[arg(long, value_name = "PROJECT")]
        project: Option<String>,

        /// Temporary location for load jobs (overrides `DF_TEMP_LOCATION`).
        #[arg(long, value_name = "PATH")]
        temp_location: Option<String>,

        /// Staging location for load jobs (overrides `DF_STAGING_LOCATION`).
        #[arg(long, value_name = "PATH")]
        staging_location: Option<String>,
    },

    /// Infers the schema of a delimited file.
    Infer {
        /// Local file path or `gs://bucket/object` URI.
        #[arg(value_name = "FILE")]
        input: String,

        /// Number of lines to sample, header included.
        #[arg(long, value_name = "N")]
        sample_lines: Option<usize>,
    },
}

/// Entry point for the Autoload command-line interface.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Handle {
            envelope,
            root,
            wait,
            print_spec,
            project,
            temp_location,
            staging_location,
        } => {
            let mut config = ServiceConfig::from_env()?;
            if let Some(project) = project {
                config = config.with_project_id(project);
            }
            if let Some(temp) = temp_location {
                config.launch.temp_location = Some(temp);
            }
            if let Some(staging) = staging_location {
                config.launch.staging_location = Some(staging);
            }
            info!("Handling {envelope} against {}", root.display());
            handle_notification(&config, &envelope, &root, wait, print_spec).await?;
        },
        Commands::Infer {
            input,
            sample_lines,
        } => {
            info!("Inferring schema of {input}");
            let mut options = InferenceOptions::new();
            if let Some(lines) = sample_lines {
                if lines == 0 {
                    bail!("--sample-lines must be at least 1");
                }
                options = options.with_sample_lines(lines);
            }
            handle_infer(&input, &options).await?;
        },
    }

    Ok(())
}

async fn handle_notification(
    config: &ServiceConfig,
    envelope: &str,
    root: &Path,
    wait: bool,
    print_spec: bool,
) -> Result<()> {
    if !root.is_dir() {
        bail!("Root '{}' is not a directory.", root.display());
    }
    let body = read_envelope(envelope)?;

    let objects = Arc::new(ObjectStoreSource::local(root));
    let tables = Arc::new(MemoryTableStore::new());
    let executor = Arc::new(LocalExecutor::new(objects.clone(), tables.clone()));
    let orchestrator = Orchestrator::new(config, objects, tables, executor.clone());

    let response = orchestrator.handle_bytes(&body).await;
    println!("{} {}", response.status, response.body);

    let submitted = executor.submitted();
    if print_spec {
        for (_, spec) in &submitted {
            println!("{}", serde_json::to_string_pretty(spec)?);
        }
    }

    if wait {
        let tables_by_job: HashMap<_, _> = submitted
            .iter()
            .map(|(id, spec)| (id.clone(), spec.table_spec()))
            .collect();
        let mut failed = 0usize;
        let rows: Vec<JobRow> = executor
            .wait()
            .await
            .into_iter()
            .map(|(job_id, result)| {
                let table = tables_by_job.get(&job_id).cloned().unwrap_or_default();
                match result {
                    Ok(report) => JobRow {
                        job_id: job_id.to_string(),
                        table,
                        rows: report.rows_appended.to_string(),
                        status: "OK".to_string(),
                    },
                    Err(e) => {
                        failed += 1;
                        JobRow {
                            job_id: job_id.to_string(),
                            table,
                            rows: "-".to_string(),
                            status: e.to_string(),
                        }
                    },
                }
            })
            .collect();
        display_jobs(rows);
        if failed > 0 {
            bail!("{failed} load job(s) failed.");
        }
    }

    if response.status >= 400 {
        return Err(anyhow!(
            "Notification was rejected with status {}.",
            response.status
        ));
    }
    Ok(())
}

fn read_envelope(envelope: &str) -> Result<Vec<u8>> {
    if envelope == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read envelope from standard input")?;
        return Ok(body);
    }
    std::fs::read(envelope).with_context(|| format!("Failed to read envelope '{envelope}'"))
}

async fn handle_infer(input: &str, options: &InferenceOptions) -> Result<()> {
    let (source, locator) = if input.starts_with("gs://") {
        let locator = parse_object_uri(input)
            .ok_or_else(|| anyhow!("Input '{input}' is not a valid gs:// object URI."))?;
        (ObjectStoreSource::gcs(), locator)
    } else {
        let (root, locator) = locate_file(Path::new(input))?;
        (ObjectStoreSource::local(root), locator)
    };
    debug!("Sampling {}", locator.uri());

    let inferred = infer_from_object(&source, &locator, options).await?;
    display_inferred_schema(input, &inferred);
    Ok(())
}

/// Split a local file path into a store root, a container directory and an object path.
fn locate_file(path: &Path) -> Result<(PathBuf, ObjectLocator)> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Input file '{}' not found.", path.display()))?;
    if !path.is_file() {
        bail!("Input '{}' is not a file.", path.display());
    }

    let file_name = path.file_name().and_then(|n| n.to_str());
    let dir = path.parent();
    let container = dir.and_then(Path::file_name).and_then(|n| n.to_str());
    let root = dir.and_then(Path::parent);
    match (root, container, file_name) {
        (Some(root), Some(container), Some(file_name)) => Ok((
            root.to_path_buf(),
            ObjectLocator::new(container, file_name),
        )),
        _ => bail!(
            "Input '{}' must be a UTF-8 path inside a directory.",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let container = dir.path().join("bucket");
        std::fs::create_dir(&container)?;
        std::fs::write(container.join("orders.csv"), "id\n1\n")?;

        let (root, locator) = locate_file(&container.join("orders.csv"))?;
        assert_eq!(root, dir.path().canonicalize()?);
        assert_eq!(locator, ObjectLocator::new("bucket", "orders.csv"));
        Ok(())
    }

    #[test]
    fn test_locate_missing_file() {
        let result = locate_file(Path::new("/definitely/not/here.csv"));
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Input file '/definitely/not/here.csv' not found."
        );
    }

    #[tokio::test]
    async fn test_handle_infer_local_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, "id,amount\n1,2.5\n2,3\n")?;

        let result = handle_infer(&path.to_string_lossy(), &InferenceOptions::new()).await;
        assert!(result.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_infer_invalid_uri() {
        let result = handle_infer("gs://bucket-only", &InferenceOptions::new()).await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Input 'gs://bucket-only' is not a valid gs:// object URI."
        );
    }

    #[tokio::test]
    async fn test_handle_notification_missing_root() {
        let config = ServiceConfig::new();
        let result =
            handle_notification(&config, "envelope.json", Path::new("/no/such/root"), false, false)
                .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Root '/no/such/root' is not a directory."
        );
    }
}
