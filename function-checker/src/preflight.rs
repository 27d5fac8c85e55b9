//! Precondition checks run before anything is created
//!
//! Any failure here aborts the run.

use std::sync::LazyLock;

use function_checker_common::TargetConfig;
use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::discovery;
use crate::kubernetes::cluster_resources::namespaces;
use crate::kubernetes::config_storage::storageclasses;
use crate::kubernetes::{K8sClient, K8sError};

static CAPACITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+Gi$").unwrap()
});

/// Fatal precondition violations
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("capacity must be a whole number of gibibytes, e.g. 50Gi (got '{0}')")]
    InvalidCapacity(String),

    #[error("storageclass {0} not found")]
    StorageClassNotFound(String),

    #[error("no storageclass given and the cluster has no default storageclass")]
    NoDefaultStorageClass,

    #[error("namespace {0} not found")]
    NamespaceNotFound(String),

    #[error("precondition check failed: {0}")]
    Api(#[from] K8sError),
}

/// Validate a volume capacity such as `50Gi`
pub fn validate_capacity(capacity: &str) -> Result<(), PreconditionError> {
    if CAPACITY_REGEX.is_match(capacity) {
        Ok(())
    } else {
        Err(PreconditionError::InvalidCapacity(capacity.to_string()))
    }
}

/// Storage class the run will use: the explicit one after an existence
/// check, otherwise the cluster default
pub async fn resolve_storage_class(
    client: &K8sClient,
    explicit: Option<&str>,
) -> Result<String, PreconditionError> {
    match explicit {
        Some(name) => {
            if !storageclasses::storage_class_exists(client, name).await? {
                return Err(PreconditionError::StorageClassNotFound(name.to_string()));
            }
            Ok(name.to_string())
        }
        None => {
            let default = discovery::default_storage_class(client)
                .await?
                .ok_or(PreconditionError::NoDefaultStorageClass)?;
            info!(storage_class = %default, "Using default storageclass");
            Ok(default)
        }
    }
}

async fn require_namespace(client: &K8sClient, name: &str) -> Result<(), PreconditionError> {
    if namespaces::namespace_exists(client, name).await? {
        Ok(())
    } else {
        Err(PreconditionError::NamespaceNotFound(name.to_string()))
    }
}

/// Run every precondition check and return the resolved storage class
///
/// Capacity is checked first so a malformed value fails without any API
/// call.
pub async fn verify(client: &K8sClient, target: &TargetConfig) -> Result<String, PreconditionError> {
    validate_capacity(&target.capacity)?;

    let storage_class = resolve_storage_class(client, target.storage_class.as_deref()).await?;
    require_namespace(client, &target.namespace).await?;
    require_namespace(client, &target.ingress_namespace).await?;

    Ok(storage_class)
}
