//! Managed resources
//!
//! A [`ManagedResource`] is a handle to one cluster object created for the
//! duration of a run. It remembers whether its create call succeeded so that
//! cleanup never touches objects this run does not own.

pub mod registry;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use thiserror::Error;
use tracing::{debug, info};

use crate::kubernetes::config_storage::{configmaps, pvcs};
use crate::kubernetes::networking::{ingress, services};
use crate::kubernetes::workloads::statefulsets;
use crate::kubernetes::{K8sClient, K8sError, K8sResult};

pub use registry::{AggregateError, OperatorRegistry, RegistryError};

/// Object spec carried by a managed resource
#[derive(Debug, Clone)]
pub enum ResourceSpec {
    ConfigMap(ConfigMap),
    Service(Service),
    /// The workload plus the label selector of the claims it spawns
    StatefulSet {
        stateful_set: StatefulSet,
        claim_selector: String,
    },
    Ingress(Ingress),
}

impl ResourceSpec {
    /// Plural lowercase kind, as used in API paths
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceSpec::ConfigMap(_) => "configmaps",
            ResourceSpec::Service(_) => "services",
            ResourceSpec::StatefulSet { .. } => "statefulsets",
            ResourceSpec::Ingress(_) => "ingresses",
        }
    }

    fn metadata(&self) -> &ObjectMeta {
        match self {
            ResourceSpec::ConfigMap(o) => &o.metadata,
            ResourceSpec::Service(o) => &o.metadata,
            ResourceSpec::StatefulSet { stateful_set, .. } => &stateful_set.metadata,
            ResourceSpec::Ingress(o) => &o.metadata,
        }
    }
}

/// Failure of a single create or delete call
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("error creating resource {identity}: {source}")]
    Create {
        identity: String,
        #[source]
        source: K8sError,
    },

    #[error("error deleting resource {identity}: {source}")]
    Delete {
        identity: String,
        #[source]
        source: K8sError,
    },
}

impl ResourceError {
    pub fn identity(&self) -> &str {
        match self {
            ResourceError::Create { identity, .. } | ResourceError::Delete { identity, .. } => {
                identity
            }
        }
    }
}

/// One cluster object owned by the current run
#[derive(Debug, Clone)]
pub struct ManagedResource {
    namespace: String,
    name: String,
    spec: ResourceSpec,
    created: bool,
}

impl ManagedResource {
    /// Wrap an object spec; name and namespace are taken from its metadata
    pub fn new(spec: ResourceSpec) -> K8sResult<Self> {
        let kind = spec.kind();
        let metadata = spec.metadata();

        let name = metadata.name.clone().ok_or_else(|| K8sError::Malformed {
            kind,
            name: String::new(),
            reason: "metadata.name is not set".to_string(),
        })?;
        let namespace = metadata
            .namespace
            .clone()
            .ok_or_else(|| K8sError::Malformed {
                kind,
                name: name.clone(),
                reason: "metadata.namespace is not set".to_string(),
            })?;

        Ok(Self {
            namespace,
            name,
            spec,
            created: false,
        })
    }

    pub fn config_map(cm: ConfigMap) -> K8sResult<Self> {
        Self::new(ResourceSpec::ConfigMap(cm))
    }

    pub fn service(svc: Service) -> K8sResult<Self> {
        Self::new(ResourceSpec::Service(svc))
    }

    pub fn stateful_set(sts: StatefulSet, claim_selector: impl Into<String>) -> K8sResult<Self> {
        Self::new(ResourceSpec::StatefulSet {
            stateful_set: sts,
            claim_selector: claim_selector.into(),
        })
    }

    pub fn ingress(ing: Ingress) -> K8sResult<Self> {
        Self::new(ResourceSpec::Ingress(ing))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> &'static str {
        self.spec.kind()
    }

    /// `namespace/kind/name`
    pub fn identity(&self) -> String {
        format!("{}/{}/{}", self.namespace, self.kind(), self.name)
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Issue one create call. A conflict is returned as is, not retried.
    pub async fn create(&mut self, client: &K8sClient) -> K8sResult<()> {
        let ns = self.namespace.as_str();

        match &self.spec {
            ResourceSpec::ConfigMap(cm) => {
                configmaps::create_configmap(client, ns, cm).await?;
            }
            ResourceSpec::Service(svc) => {
                services::create_service(client, ns, svc).await?;
            }
            ResourceSpec::StatefulSet { stateful_set, .. } => {
                statefulsets::create_statefulset(client, ns, stateful_set).await?;
            }
            ResourceSpec::Ingress(ing) => {
                ingress::create_ingress(client, ns, ing).await?;
            }
        }

        self.created = true;
        info!(resource = %self.identity(), "Resource created");
        Ok(())
    }

    /// Issue one delete call. The workload also removes its volume claims.
    pub async fn delete(&mut self, client: &K8sClient) -> K8sResult<()> {
        let ns = self.namespace.as_str();
        let name = self.name.as_str();

        match &self.spec {
            ResourceSpec::ConfigMap(_) => configmaps::delete_configmap(client, ns, name).await?,
            ResourceSpec::Service(_) => services::delete_service(client, ns, name).await?,
            ResourceSpec::Ingress(_) => ingress::delete_ingress(client, ns, name).await?,
            ResourceSpec::StatefulSet { claim_selector, .. } => {
                statefulsets::delete_statefulset(client, ns, name).await?;
                self.created = false;

                debug!(resource = %self.identity(), selector = %claim_selector, "Deleting volume claims");
                pvcs::delete_pvcs_by_label(client, ns, claim_selector).await?;
            }
        }

        self.created = false;
        info!(resource = %self.identity(), "Resource deleted");
        Ok(())
    }
}
