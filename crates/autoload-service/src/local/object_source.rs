//! `object_store`-backed [`ObjectSource`].

use std::collections::HashMap;
use std::env;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use autoload_core::error::CollaboratorError;
use autoload_core::io::{ByteStream, ObjectSource};
use autoload_core::types::ObjectLocator;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use url::Url;

/// Where containers without an explicitly registered store are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fallback {
    /// Only registered stores are available.
    None,
    /// Each container is a sub-directory of this root.
    LocalRoot(PathBuf),
    /// Each container is a Google Cloud Storage bucket.
    Gcs,
}

/// Reads objects through `object_store`, one store per container.
#[derive(Debug)]
pub struct ObjectStoreSource {
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
    fallback: Fallback,
}

impl Default for ObjectStoreSource {
    fn default() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
            fallback: Fallback::None,
        }
    }
}

impl ObjectStoreSource {
    /// A source with no stores registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that maps container `c` to the directory `root/c`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            fallback: Fallback::LocalRoot(root.into()),
            ..Self::default()
        }
    }

    /// A source that maps every container to a Google Cloud Storage bucket, configured from
    /// the environment.
    #[must_use]
    pub fn gcs() -> Self {
        Self {
            fallback: Fallback::Gcs,
            ..Self::default()
        }
    }

    /// Register a store for one container.
    #[must_use]
    pub fn with_store(self, container: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.register(container, store);
        self
    }

    /// Register a store for one container on a shared source.
    pub fn register(&self, container: impl Into<String>, store: Arc<dyn ObjectStore>) {
        match self.stores.write() {
            Ok(mut stores) => {
                stores.insert(container.into(), store);
            },
            Err(poisoned) => {
                poisoned.into_inner().insert(container.into(), store);
            },
        }
    }

    fn store_for(&self, container: &str) -> Result<Arc<dyn ObjectStore>, CollaboratorError> {
        if let Some(store) = self
            .stores
            .read()
            .ok()
            .and_then(|stores| stores.get(container).cloned())
        {
            return Ok(store);
        }

        let store: Arc<dyn ObjectStore> = match &self.fallback {
            Fallback::None => {
                return Err(CollaboratorError::NotFound {
                    what: format!("container '{container}'"),
                });
            },
            Fallback::LocalRoot(root) => {
                let dir = root.join(container);
                if !dir.is_dir() {
                    return Err(CollaboratorError::NotFound {
                        what: format!("container '{container}' under {}", root.display()),
                    });
                }
                let fs = LocalFileSystem::new_with_prefix(&dir).map_err(|e| {
                    CollaboratorError::backend(format!("open {}", dir.display()), e)
                })?;
                Arc::new(fs)
            },
            Fallback::Gcs => {
                let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(container);
                if !gcp_credentials_configured() {
                    builder = builder.with_skip_signature(true);
                }
                let gcs = builder.build().map_err(|e| {
                    CollaboratorError::backend(format!("configure bucket '{container}'"), e)
                })?;
                Arc::new(gcs)
            },
        };

        tracing::debug!(container, "Registered object store");
        self.register(container, Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl ObjectSource for ObjectStoreSource {
    async fn read_range(
        &self,
        locator: &ObjectLocator,
        range: Range<u64>,
    ) -> Result<Bytes, CollaboratorError> {
        let store = self.store_for(&locator.container)?;
        let path = Path::from(locator.path.as_str());

        let meta = store
            .head(&path)
            .await
            .map_err(|e| map_store_error(locator, e))?;
        let start = range.start.min(meta.size);
        let end = range.end.min(meta.size);
        if start >= end {
            return Ok(Bytes::new());
        }

        store
            .get_range(&path, start..end)
            .await
            .map_err(|e| map_store_error(locator, e))
    }

    async fn open(&self, locator: &ObjectLocator) -> Result<ByteStream, CollaboratorError> {
        let store = self.store_for(&locator.container)?;
        let path = Path::from(locator.path.as_str());

        let result = store
            .get(&path)
            .await
            .map_err(|e| map_store_error(locator, e))?;
        let uri = locator.uri();
        Ok(result
            .into_stream()
            .map_err(move |e| CollaboratorError::backend(format!("read {uri}"), e))
            .boxed())
    }
}

/// Parse a `gs://bucket/path` URI into a locator.
#[must_use]
pub fn parse_object_uri(uri: &str) -> Option<ObjectLocator> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "gs" {
        return None;
    }
    let container = url.host_str().filter(|h| !h.is_empty())?;
    let path = Path::from_url_path(url.path()).ok()?;
    if path.as_ref().is_empty() {
        return None;
    }
    Some(ObjectLocator::new(container, path.as_ref()))
}

fn map_store_error(locator: &ObjectLocator, err: object_store::Error) -> CollaboratorError {
    match err {
        object_store::Error::NotFound { .. } => CollaboratorError::NotFound {
            what: format!("object {}", locator.uri()),
        },
        other => CollaboratorError::backend(format!("read {}", locator.uri()), other),
    }
}

fn gcp_credentials_configured() -> bool {
    const GCP_VARS: &[&str] = &[
        "GOOGLE_APPLICATION_CREDENTIALS",
        "GOOGLE_SERVICE_ACCOUNT",
        "GOOGLE_SERVICE_ACCOUNT_PATH",
        "GOOGLE_SERVICE_ACCOUNT_KEY",
    ];
    GCP_VARS
        .iter()
        .any(|key| env::var(key).map(|v| !v.is_empty()).unwrap_or(false))
}
