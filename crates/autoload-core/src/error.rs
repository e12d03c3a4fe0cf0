//! Error types for Autoload.
//!
//! Every failure that can end a notification pass is a variant of [`AutoloadError`]. Each
//! area of the pipeline owns its own enum so that messages keep their context, and the root
//! type decides whether the caller should redeliver the notification ([`Disposition`]).

use thiserror::Error;

/// Main error type for an ingestion pass.
///
/// Display formatting is delegated to the wrapped area error.
#[derive(Debug, Error)]
pub enum AutoloadError {
    /// The push envelope could not be decoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// No object locator could be recovered from the notification.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Sampling or schema inference failed.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Creating the destination dataset or table failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Building or submitting the load job failed.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// The service configuration is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Anything else raised by a dependency.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Whether a failed notification should be delivered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The request itself is unusable; acknowledge it so it is not redelivered.
    Permanent,
    /// The failure may clear up on its own; ask the caller to redeliver.
    Transient,
}

impl Disposition {
    /// HTTP status code reported to the push caller for this disposition.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Permanent => 400,
            Self::Transient => 500,
        }
    }
}

/// Errors raised while decoding the push envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The request body has no `message` field.
    #[error("Missing 'message' in push payload")]
    MissingMessage,

    /// `message` is present but is not shaped like a push message.
    #[error("Malformed push message: {reason}")]
    MalformedMessage {
        /// What was wrong with the message
        reason: String,
    },

    /// `message.data` is not valid base64.
    #[error("Invalid message data: {reason}")]
    InvalidData {
        /// Decoder error text
        reason: String,
    },
}

/// No known notification shape yielded a container and object path.
#[derive(Debug, Error)]
#[error("Could not extract container/object from notification (payload keys: [{payload_keys}], attribute keys: [{attribute_keys}])")]
pub struct ExtractionError {
    /// Top-level keys found in the decoded payload
    pub payload_keys: String,
    /// Attribute keys found on the message
    pub attribute_keys: String,
}

/// Errors raised while sampling an object and inferring its schema.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The sampled head of the object contained no lines.
    #[error("Sample of '{uri}' is empty; cannot infer schema")]
    SampleEmpty {
        /// The sampled object
        uri: String,
    },

    /// The first line is not a usable header.
    #[error("Header of '{uri}' is invalid: {reason}")]
    HeaderInvalid {
        /// The sampled object
        uri: String,
        /// Why the header was rejected
        reason: String,
    },

    /// The sample could not be tokenized.
    #[error("Failed to parse sample of '{uri}': {source}")]
    Parse {
        /// The sampled object
        uri: String,
        /// The underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// The ranged read against the object store failed.
    #[error("Failed to read sample of '{uri}': {source}")]
    Read {
        /// The sampled object
        uri: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },
}

/// Errors raised while provisioning destination containers and tables.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Looking up or creating the dataset failed.
    #[error("Failed to ensure dataset '{dataset}': {source}")]
    Dataset {
        /// Dataset identifier
        dataset: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },

    /// Looking up or creating the table failed.
    #[error("Failed to ensure table '{table}': {source}")]
    Table {
        /// Table identifier
        table: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },
}

/// Errors raised while building or submitting a load job.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A location the load engine needs was not configured.
    #[error("Launch configuration incomplete: {option} must be set to a valid storage path")]
    MissingLocation {
        /// The missing option name
        option: String,
    },

    /// The inferred column list is empty.
    #[error("Launch configuration incomplete: column list is empty; cannot map rows to columns")]
    EmptyColumns,

    /// The executor rejected the job.
    #[error("Failed to submit job '{job_name}': {source}")]
    Submit {
        /// Name of the job that was submitted
        job_name: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },
}

/// Errors reported by external collaborators (object store, table store, executor).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The requested resource does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing resource
        what: String,
    },

    /// A create call raced with another creator.
    #[error("{what} already exists")]
    AlreadyExists {
        /// Description of the existing resource
        what: String,
    },

    /// Any other backend failure.
    #[error("{context}: {source}")]
    Backend {
        /// What was being attempted
        context: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CollaboratorError {
    /// Wrap a backend error with a description of the attempted operation.
    pub fn backend(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`CollaboratorError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for [`CollaboratorError::AlreadyExists`].
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Errors raised by a running load job.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The job has no columns to map rows onto.
    #[error("Load job '{job_name}' has an empty column list")]
    NoColumns {
        /// Job name
        job_name: String,
    },

    /// Opening the source object failed.
    #[error("Failed to open '{uri}': {source}")]
    Open {
        /// Source object
        uri: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },

    /// Streaming the source object failed part-way.
    #[error("Failed to read '{uri}' at line {line}: {source}")]
    Read {
        /// Source object
        uri: String,
        /// 1-based line number being read
        line: usize,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed into fields.
    #[error("Failed to parse '{uri}' line {line}: {source}")]
    Parse {
        /// Source object
        uri: String,
        /// 1-based line number
        line: usize,
        /// The underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// Appending rows to the destination failed.
    #[error("Failed to append rows to '{table}': {source}")]
    Append {
        /// Destination table spec
        table: String,
        /// The collaborator error
        #[source]
        source: CollaboratorError,
    },

    /// The job task ended without producing a result.
    #[error("Load job '{job_id}' aborted: {message}")]
    Aborted {
        /// Executor job identifier
        job_id: String,
        /// Why the task ended
        message: String,
    },
}

/// Type alias for Results using `AutoloadError`.
pub type Result<T> = std::result::Result<T, AutoloadError>;

impl AutoloadError {
    /// Classify the error for the push caller.
    ///
    /// Envelope and extraction failures are properties of the request and never heal, so they
    /// are acknowledged. Everything else, including executor submission failures, is treated as
    /// transient and redelivered.
    #[must_use]
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::Envelope(_) | Self::Extraction(_) => Disposition::Permanent,
            Self::Inference(_)
            | Self::Provision(_)
            | Self::Launch(_)
            | Self::Config(_)
            | Self::Other(_) => Disposition::Transient,
        }
    }

    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Envelope(e) => format!("Bad Request: {e}"),
            Self::Extraction(_) => "Bad Request: missing bucket/object".to_string(),
            Self::Inference(e) => format!("Schema inference error: {e}"),
            Self::Provision(e) => format!("Provisioning error: {e}"),
            Self::Launch(e) => format!("Launch error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }
}
