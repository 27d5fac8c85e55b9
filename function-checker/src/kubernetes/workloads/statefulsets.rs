//! StatefulSet operations

use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::{Api, DeleteParams, PostParams};

use crate::kubernetes::client::K8sClient;
use crate::kubernetes::error::K8sResult;

/// Declared vs ready replica counts of a StatefulSet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaCounts {
    pub declared: i32,
    pub ready: i32,
}

impl ReplicaCounts {
    pub fn is_ready(&self) -> bool {
        self.declared == self.ready
    }
}

/// Create a StatefulSet in `namespace`
pub async fn create_statefulset(
    client: &K8sClient,
    namespace: &str,
    statefulset: &StatefulSet,
) -> K8sResult<StatefulSet> {
    let sts: Api<StatefulSet> = Api::namespaced(client.inner().clone(), namespace);
    let created = sts.create(&PostParams::default(), statefulset).await?;

    Ok(created)
}

/// Delete a StatefulSet
pub async fn delete_statefulset(client: &K8sClient, namespace: &str, name: &str) -> K8sResult<()> {
    let sts: Api<StatefulSet> = Api::namespaced(client.inner().clone(), namespace);
    sts.delete(name, &DeleteParams::default()).await?;

    Ok(())
}

/// Fetch the current replica counts of a StatefulSet
pub async fn get_replica_counts(
    client: &K8sClient,
    namespace: &str,
    name: &str,
) -> K8sResult<ReplicaCounts> {
    let sts: Api<StatefulSet> = Api::namespaced(client.inner().clone(), namespace);
    let statefulset = sts.get(name).await?;

    Ok(replica_counts(&statefulset))
}

/// Extract replica counts; an unset spec defaults to 1 replica, an unset
/// status to 0 ready
pub fn replica_counts(sts: &StatefulSet) -> ReplicaCounts {
    let declared = sts
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = sts
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);

    ReplicaCounts { declared, ready }
}
