//! Operator registry
//!
//! Ordered collection of managed resources driving bulk create and bulk
//! delete. A failing resource never aborts the batch; its error is collected
//! and the remaining resources are still processed.

use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use super::{ManagedResource, ResourceError};
use crate::kubernetes::K8sClient;

/// Registry misuse
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot add {identity}: resource creation has already begun")]
    Sealed { identity: String },
}

/// Every per-resource failure of one bulk operation
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<ResourceError>,
}

impl AggregateError {
    pub fn errors(&self) -> &[ResourceError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ResourceError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [single] => write!(f, "{}", single),
            errors => {
                write!(f, "[")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::error::Error for AggregateError {}

fn aggregate(errors: Vec<ResourceError>) -> Result<(), AggregateError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AggregateError { errors })
    }
}

/// Ordered set of resources created and deleted as a unit
#[derive(Debug, Default)]
pub struct OperatorRegistry {
    resources: Vec<ManagedResource>,
    sealed: bool,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append resources; rejected once creation has begun
    pub fn add<I>(&mut self, resources: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = ManagedResource>,
    {
        for resource in resources {
            if self.sealed {
                return Err(RegistryError::Sealed {
                    identity: resource.identity(),
                });
            }
            self.resources.push(resource);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagedResource> {
        self.resources.iter()
    }

    /// Number of resources whose create call succeeded and that are not yet
    /// deleted
    pub fn created_count(&self) -> usize {
        self.resources.iter().filter(|r| r.is_created()).count()
    }

    /// Whether a resource of the given plural kind is registered
    pub fn contains_kind(&self, kind: &str) -> bool {
        self.resources.iter().any(|r| r.kind() == kind)
    }

    /// Create every resource in insertion order
    pub async fn create_all(&mut self, client: &K8sClient) -> Result<(), AggregateError> {
        self.create_all_until(client, || false).await
    }

    /// Create resources in insertion order, stopping before the next one once
    /// `stop` returns true. An in-flight create is never interrupted.
    pub async fn create_all_until<F>(
        &mut self,
        client: &K8sClient,
        stop: F,
    ) -> Result<(), AggregateError>
    where
        F: Fn() -> bool,
    {
        self.sealed = true;
        let mut errors = Vec::new();

        for resource in self.resources.iter_mut() {
            if stop() {
                warn!(
                    next = %resource.identity(),
                    "Resource creation stopped before completion"
                );
                break;
            }

            if let Err(e) = resource.create(client).await {
                if e.is_conflict() {
                    warn!(
                        resource = %resource.identity(),
                        "Resource already exists, probably left over from an earlier run; it will not be deleted"
                    );
                } else {
                    warn!(resource = %resource.identity(), error = %e, "Failed to create resource");
                }
                errors.push(ResourceError::Create {
                    identity: resource.identity(),
                    source: e,
                });
            }
        }

        aggregate(errors)
    }

    /// Delete every created resource in insertion order
    pub async fn delete_all(&mut self, client: &K8sClient) -> Result<(), AggregateError> {
        let mut errors = Vec::new();
        let mut deleted = 0usize;

        for resource in self.resources.iter_mut().filter(|r| r.is_created()) {
            match resource.delete(client).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(resource = %resource.identity(), error = %e, "Failed to delete resource");
                    errors.push(ResourceError::Delete {
                        identity: resource.identity(),
                        source: e,
                    });
                }
            }
        }

        info!(deleted, failed = errors.len(), "Cleanup finished");
        aggregate(errors)
    }
}
